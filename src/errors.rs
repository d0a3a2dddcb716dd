use sqlx::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
    #[error("Trading calendar unavailable: {0}")]
    CalendarUnavailable(String),
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Encryption failed: {0}")]
    Encryption(String),
    #[error("External error: {0}")]
    External(String),
}

impl AppError {
    /// Soft failures yield an empty result for the current cycle; the next
    /// scheduled refresh tick retries naturally. Everything else must be
    /// surfaced to the caller.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            AppError::CalendarUnavailable(_) | AppError::DataUnavailable(_)
        )
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: Error) -> Self {
        AppError::Db(value)
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}
