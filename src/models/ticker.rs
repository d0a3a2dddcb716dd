use serde::{Deserialize, Serialize};

/// A ticker the user follows on the board. Name and exchange come from the
/// provider's asset lookup when the ticker is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackedTicker {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub is_favorite: bool,
}

pub fn validate_symbol(symbol: &str) -> Result<(), String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err("symbol must not be empty".to_string());
    }
    if trimmed.len() > 30 {
        return Err("symbol must be at most 30 characters".to_string());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(format!("symbol '{}' contains invalid characters", symbol));
    }
    Ok(())
}
