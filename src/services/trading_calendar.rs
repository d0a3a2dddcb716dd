use crate::errors::AppError;
use crate::external::market_data::{MarketDataError, MarketDataProvider, TradingSession};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// The exchange's local zone. User-facing timezone settings never feed into
/// session resolution.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// Quotes from the data feed lag by this much on the free tier, so intraday
/// windows must end this far before the current instant.
pub const FEED_DELAY_MINUTES: i64 = 15;

fn pre_market_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 45, 0).expect("valid time")
}

fn session_settle() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 15, 0).expect("valid time")
}

pub fn exchange_now(now_utc: DateTime<Utc>) -> DateTime<Tz> {
    now_utc.with_timezone(&EXCHANGE_TZ)
}

/// Converts an exchange-local wall time to UTC. Around DST transitions the
/// earlier mapping wins; a nonexistent local time falls back to the UTC
/// reading of the same wall clock.
pub fn exchange_local_to_utc(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match EXCHANGE_TZ.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

/// Where "now" sits relative to today's session, with the settle buffer past
/// the closing bell. Exactly 09:45 counts as neither pre-open nor regular;
/// it gets the closed-session treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketPhase {
    PreOpen,
    Regular,
    Closed,
}

pub fn market_phase(now_local: DateTime<Tz>) -> MarketPhase {
    let t = now_local.time();
    if t < pre_market_cutoff() {
        MarketPhase::PreOpen
    } else if t > pre_market_cutoff() && t < session_settle() {
        MarketPhase::Regular
    } else {
        MarketPhase::Closed
    }
}

fn calendar_err(e: MarketDataError) -> AppError {
    AppError::CalendarUnavailable(e.to_string())
}

/// The earliest confirmed session within [start, end].
pub async fn first_session_in_range(
    provider: &dyn MarketDataProvider,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<NaiveDate, AppError> {
    let sessions = provider
        .trading_sessions(start, end)
        .await
        .map_err(calendar_err)?;
    sessions
        .first()
        .map(|s| s.date)
        .ok_or_else(|| AppError::CalendarUnavailable("no sessions in range".to_string()))
}

/// The two most recent comparison sessions within [start, end], oldest
/// first. See [`select_last_two`] for the pre-market rule.
pub async fn last_two_sessions(
    provider: &dyn MarketDataProvider,
    start: NaiveDate,
    end: NaiveDate,
    now_local: DateTime<Tz>,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let sessions = provider
        .trading_sessions(start, end)
        .await
        .map_err(calendar_err)?;
    select_last_two(&sessions, now_local)
}

/// Picks the comparison pair from an ascending session list.
///
/// When the most recent session is today and the local clock is still
/// before 09:45, today has no usable close yet and no fresh intraday
/// prints either, so the pair shifts back one session. Weekends and
/// holidays need no special casing: the calendar simply doesn't contain
/// them, and the last two entries are the right answer.
pub fn select_last_two(
    sessions: &[TradingSession],
    now_local: DateTime<Tz>,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let n = sessions.len();
    if n == 0 {
        return Err(AppError::CalendarUnavailable(
            "no sessions in range".to_string(),
        ));
    }

    let today = now_local.date_naive();
    let last_is_immature =
        sessions[n - 1].date == today && now_local.time() < pre_market_cutoff();

    let (older, newer) = if last_is_immature {
        if n < 3 {
            return Err(AppError::CalendarUnavailable(
                "not enough sessions in range for a comparison pair".to_string(),
            ));
        }
        (sessions[n - 3].date, sessions[n - 2].date)
    } else {
        if n < 2 {
            return Err(AppError::CalendarUnavailable(
                "not enough sessions in range for a comparison pair".to_string(),
            ));
        }
        (sessions[n - 2].date, sessions[n - 1].date)
    };

    Ok((older, newer))
}

/// The 15:59–16:00 exchange-local minute of a session, i.e. the bucket
/// holding that session's closing bar.
pub fn closing_minute_window(session: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = NaiveTime::from_hms_opt(15, 59, 0).expect("valid time");
    let end = NaiveTime::from_hms_opt(16, 0, 0).expect("valid time");
    (
        exchange_local_to_utc(session, start),
        exchange_local_to_utc(session, end),
    )
}

/// The one-minute window holding the freshest bar we are allowed to read
/// for a session. Mid-session on the current trading day that is the minute
/// ending [`FEED_DELAY_MINUTES`] ago; in every other case the session's
/// closing minute.
pub fn latest_bar_window(
    session: NaiveDate,
    now_local: DateTime<Tz>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    if session == now_local.date_naive() && market_phase(now_local) == MarketPhase::Regular {
        let now_utc = now_local.with_timezone(&Utc);
        (
            now_utc - Duration::minutes(FEED_DELAY_MINUTES + 1),
            now_utc - Duration::minutes(FEED_DELAY_MINUTES),
        )
    } else {
        closing_minute_window(session)
    }
}
