use crate::errors::AppError;
use crate::jobs::{ticker_refresh_job, JobContext, RefreshSnapshot};
use crate::models::settings::validate_refresh_interval;
use tokio::sync::watch;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Drives the periodic ticker refresh. Interval must be one of the allowed
/// settings values; they all divide 60, so the second-field cron expression
/// fires exactly every N seconds.
pub struct RefreshScheduler {
    scheduler: JobScheduler,
    context: JobContext,
    interval_secs: i64,
}

impl RefreshScheduler {
    pub async fn new(context: JobContext, interval_secs: i64) -> Result<Self, AppError> {
        validate_refresh_interval(interval_secs)?;
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("failed to create scheduler: {}", e)))?;
        Ok(Self {
            scheduler,
            context,
            interval_secs,
        })
    }

    /// A receiver for the refresh snapshots this scheduler publishes.
    pub fn subscribe(&self) -> watch::Receiver<RefreshSnapshot> {
        self.context.snapshot_tx.subscribe()
    }

    pub async fn start(&mut self) -> Result<(), AppError> {
        let schedule = format!("*/{} * * * * *", self.interval_secs);
        let ctx = self.context.clone();

        let job = Job::new_async(schedule.as_str(), move |_id, _scheduler| {
            let ctx = ctx.clone();
            Box::pin(async move {
                if let Err(e) = ticker_refresh_job::run(&ctx).await {
                    error!("ticker refresh failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::External(format!("failed to build refresh job: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("failed to add refresh job: {}", e)))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("failed to start scheduler: {}", e)))?;

        info!("ticker refresh scheduled every {}s", self.interval_secs);
        Ok(())
    }

    /// Stop the scheduler. Called on application exit; a tick in flight
    /// finishes, no new ones start.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("failed to stop scheduler: {}", e)))?;
        info!("ticker refresh stopped");
        Ok(())
    }
}
