use serde::{Deserialize, Serialize};

/// The store holds exactly one settings row (single-user application).
pub const SETTINGS_ROW_ID: i64 = 0;

/// Refresh intervals the UI offers, in seconds. All divide 60, which keeps
/// the cron expression for the refresh job exact.
pub const ALLOWED_REFRESH_INTERVALS: [i64; 5] = [5, 10, 15, 30, 60];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSettings {
    pub id: i64,
    pub api_key: String,
    pub api_secret: String,
    pub refresh_interval: i64,
    pub dark_mode: bool,
    /// IANA zone name, display-only. Session resolution always uses the
    /// exchange zone.
    pub timezone: String,
    pub secret_cipher: Option<String>,
    pub secret_salt: Option<String>,
    pub secret_iv: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUserSettings {
    pub api_key: String,
    pub api_secret: String,
    pub refresh_interval: i64,
    pub dark_mode: bool,
    pub timezone: String,
}

impl NewUserSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("api_key must not be empty".to_string());
        }
        if self.api_secret.trim().is_empty() {
            return Err("api_secret must not be empty".to_string());
        }
        validate_refresh_interval(self.refresh_interval)?;
        validate_timezone(&self.timezone)?;
        Ok(())
    }
}

pub fn validate_refresh_interval(interval: i64) -> Result<(), String> {
    if ALLOWED_REFRESH_INTERVALS.contains(&interval) {
        Ok(())
    } else {
        Err(format!(
            "refresh_interval must be one of {:?}, got {}",
            ALLOWED_REFRESH_INTERVALS, interval
        ))
    }
}

pub fn validate_timezone(timezone: &str) -> Result<(), String> {
    timezone
        .parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a valid IANA timezone", timezone))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> NewUserSettings {
        NewUserSettings {
            api_key: "PK_TEST".to_string(),
            api_secret: "SK_TEST".to_string(),
            refresh_interval: 10,
            dark_mode: true,
            timezone: "America/New_York".to_string(),
        }
    }

    #[test]
    fn accepts_valid_settings() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn rejects_blank_credentials() {
        let mut s = valid_settings();
        s.api_key = "  ".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_off_menu_refresh_interval() {
        assert!(validate_refresh_interval(7).is_err());
        for allowed in ALLOWED_REFRESH_INTERVALS {
            assert!(validate_refresh_interval(allowed).is_ok());
        }
    }

    #[test]
    fn rejects_bogus_timezone() {
        assert!(validate_timezone("Mars/Olympus_Mons").is_err());
        assert!(validate_timezone("Europe/Berlin").is_ok());
    }
}
