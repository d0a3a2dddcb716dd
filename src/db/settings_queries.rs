use sqlx::SqlitePool;

use crate::models::settings::{NewUserSettings, UserSettings, SETTINGS_ROW_ID};

const SETTINGS_COLUMNS: &str = "id, api_key, api_secret, refresh_interval, dark_mode, timezone, \
     secret_cipher, secret_salt, secret_iv";

/// Get the single settings row, if it exists.
pub async fn get(pool: &SqlitePool) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "SELECT {} FROM user_settings WHERE id = ?",
        SETTINGS_COLUMNS
    ))
    .bind(SETTINGS_ROW_ID)
    .fetch_optional(pool)
    .await
}

/// Insert the settings row. Fails on the primary key if one already exists.
pub async fn insert(
    pool: &SqlitePool,
    settings: &NewUserSettings,
) -> Result<UserSettings, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        r#"
        INSERT INTO user_settings (id, api_key, api_secret, refresh_interval, dark_mode, timezone)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        SETTINGS_COLUMNS
    ))
    .bind(SETTINGS_ROW_ID)
    .bind(&settings.api_key)
    .bind(&settings.api_secret)
    .bind(settings.refresh_interval)
    .bind(settings.dark_mode)
    .bind(&settings.timezone)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_settings WHERE id = ?")
        .bind(SETTINGS_ROW_ID)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn update_credentials(
    pool: &SqlitePool,
    api_key: &str,
    api_secret: &str,
) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "UPDATE user_settings SET api_key = ?, api_secret = ? WHERE id = ? RETURNING {}",
        SETTINGS_COLUMNS
    ))
    .bind(api_key)
    .bind(api_secret)
    .bind(SETTINGS_ROW_ID)
    .fetch_optional(pool)
    .await
}

pub async fn update_refresh_interval(
    pool: &SqlitePool,
    interval: i64,
) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "UPDATE user_settings SET refresh_interval = ? WHERE id = ? RETURNING {}",
        SETTINGS_COLUMNS
    ))
    .bind(interval)
    .bind(SETTINGS_ROW_ID)
    .fetch_optional(pool)
    .await
}

pub async fn update_dark_mode(
    pool: &SqlitePool,
    dark_mode: bool,
) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "UPDATE user_settings SET dark_mode = ? WHERE id = ? RETURNING {}",
        SETTINGS_COLUMNS
    ))
    .bind(dark_mode)
    .bind(SETTINGS_ROW_ID)
    .fetch_optional(pool)
    .await
}

pub async fn update_timezone(
    pool: &SqlitePool,
    timezone: &str,
) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "UPDATE user_settings SET timezone = ? WHERE id = ? RETURNING {}",
        SETTINGS_COLUMNS
    ))
    .bind(timezone)
    .bind(SETTINGS_ROW_ID)
    .fetch_optional(pool)
    .await
}

/// Replace the stored secret triple (all Base64).
pub async fn update_secret(
    pool: &SqlitePool,
    cipher_b64: &str,
    salt_b64: &str,
    iv_b64: &str,
) -> Result<Option<UserSettings>, sqlx::Error> {
    sqlx::query_as::<_, UserSettings>(&format!(
        "UPDATE user_settings SET secret_cipher = ?, secret_salt = ?, secret_iv = ? \
         WHERE id = ? RETURNING {}",
        SETTINGS_COLUMNS
    ))
    .bind(cipher_b64)
    .bind(salt_b64)
    .bind(iv_b64)
    .bind(SETTINGS_ROW_ID)
    .fetch_optional(pool)
    .await
}
