pub mod settings;
pub mod ticker;

pub use settings::{NewUserSettings, UserSettings, ALLOWED_REFRESH_INTERVALS, SETTINGS_ROW_ID};
pub use ticker::TrackedTicker;
