//! Engine settings and configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Engine settings
///
/// Stored as JSON; missing fields fall back to their defaults.
///
/// # Example
/// ```rust,no_run
/// use chatsync::storage::Settings;
///
/// // Load settings (returns default if file doesn't exist)
/// let settings = Settings::load("chatsync.json").expect("Failed to load");
///
/// println!("History page size: {}", settings.page_size);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Messages per history page requested from the bundled SQLite provider
    pub page_size: usize,
    /// Whether display notifications are sent when messages become visible
    pub send_display_receipts: bool,
    /// Capacity of the store's change broadcast channel
    pub event_channel_capacity: usize,
    /// Path of the SQLite history database; in-memory when unset
    pub history_db_path: Option<String>,
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to the settings file
    ///
    /// # Returns
    /// The loaded settings, or default settings if file doesn't exist
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Settings(format!("Failed to read settings: {}", e)))?;

        // Handle empty file (return defaults)
        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Settings(format!("Failed to parse settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to save the settings file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Settings(format!("Failed to create settings directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Settings(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, json)
            .map_err(|e| Error::Settings(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Settings("page_size must be at least 1".to_string()));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Settings(
                "event_channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 25,
            send_display_receipts: true,
            event_channel_capacity: 256,
            history_db_path: None,
        }
    }
}
