use sqlx::SqlitePool;
use tracing::info;

use crate::db::settings_queries;
use crate::errors::AppError;
use crate::external::market_data::{MarketDataError, MarketDataProvider};
use crate::models::settings::{
    validate_refresh_interval, validate_timezone, NewUserSettings, UserSettings,
};
use crate::services::safe_store::{self, SealedSecret};

/// Credentials are always probed against the provider before they are
/// persisted; an unvalidated pair never reaches the store.
async fn ensure_valid_credentials(
    provider: &dyn MarketDataProvider,
    api_key: &str,
    api_secret: &str,
) -> Result<(), AppError> {
    let accepted = provider
        .check_credentials(api_key, api_secret)
        .await
        .map_err(|e: MarketDataError| AppError::External(e.to_string()))?;
    if accepted {
        Ok(())
    } else {
        Err(AppError::Validation(
            "API credentials were rejected by the provider".to_string(),
        ))
    }
}

/// Create the single settings row. Only one is allowed; a second create is
/// rejected rather than silently overwriting the first.
pub async fn add_user_settings(
    pool: &SqlitePool,
    provider: &dyn MarketDataProvider,
    settings: NewUserSettings,
) -> Result<UserSettings, AppError> {
    settings.validate()?;
    if settings_queries::get(pool).await?.is_some() {
        return Err(AppError::Validation(
            "user settings already exist".to_string(),
        ));
    }
    ensure_valid_credentials(provider, &settings.api_key, &settings.api_secret).await?;
    let saved = settings_queries::insert(pool, &settings).await?;
    info!("user settings created");
    Ok(saved)
}

pub async fn get_user_settings(pool: &SqlitePool) -> Result<Option<UserSettings>, AppError> {
    Ok(settings_queries::get(pool).await?)
}

pub async fn delete_user_settings(pool: &SqlitePool) -> Result<(), AppError> {
    settings_queries::delete(pool).await?;
    info!("user settings deleted");
    Ok(())
}

pub async fn update_api_credentials(
    pool: &SqlitePool,
    provider: &dyn MarketDataProvider,
    api_key: &str,
    api_secret: &str,
) -> Result<UserSettings, AppError> {
    if api_key.trim().is_empty() || api_secret.trim().is_empty() {
        return Err(AppError::Validation(
            "api_key and api_secret must not be empty".to_string(),
        ));
    }
    ensure_valid_credentials(provider, api_key, api_secret).await?;
    settings_queries::update_credentials(pool, api_key, api_secret)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update_refresh_interval(
    pool: &SqlitePool,
    interval: i64,
) -> Result<UserSettings, AppError> {
    validate_refresh_interval(interval)?;
    settings_queries::update_refresh_interval(pool, interval)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update_dark_mode(
    pool: &SqlitePool,
    dark_mode: bool,
) -> Result<UserSettings, AppError> {
    settings_queries::update_dark_mode(pool, dark_mode)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update_timezone(pool: &SqlitePool, timezone: &str) -> Result<UserSettings, AppError> {
    validate_timezone(timezone)?;
    settings_queries::update_timezone(pool, timezone)
        .await?
        .ok_or(AppError::NotFound)
}

/// Seal the password with a fresh salt and IV and persist the triple.
/// Failures here are fatal for the operation and surfaced to the caller;
/// nothing partial is written.
pub async fn store_secret(pool: &SqlitePool, password: &str) -> Result<(), AppError> {
    let sealed = safe_store::seal(password)?;
    settings_queries::update_secret(pool, &sealed.cipher_b64, &sealed.salt_b64, &sealed.iv_b64)
        .await?
        .ok_or(AppError::NotFound)?;
    info!("stored secret updated");
    Ok(())
}

/// The persisted ciphertext/salt/IV triple, or NotFound if no secret has
/// been stored yet.
pub async fn get_stored_secret(pool: &SqlitePool) -> Result<SealedSecret, AppError> {
    let settings = settings_queries::get(pool).await?.ok_or(AppError::NotFound)?;
    match (
        settings.secret_cipher,
        settings.secret_salt,
        settings.secret_iv,
    ) {
        (Some(cipher_b64), Some(salt_b64), Some(iv_b64)) => Ok(SealedSecret {
            cipher_b64,
            salt_b64,
            iv_b64,
        }),
        _ => Err(AppError::NotFound),
    }
}

/// Check a candidate password against the stored secret by re-encryption.
pub async fn verify_secret(pool: &SqlitePool, candidate: &str) -> Result<bool, AppError> {
    let sealed = get_stored_secret(pool).await?;
    safe_store::verify(candidate, &sealed)
}
