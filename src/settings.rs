//! Chat settings and configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat settings
///
/// Endpoints plus every timing and size constant the chat screen uses.
/// Settings are stored in JSON format and can be loaded/saved from disk.
///
/// # Example
/// ```rust,no_run
/// use threadline::settings::ChatSettings;
///
/// // Load settings (returns default if file doesn't exist)
/// let settings = ChatSettings::load("chat.json").expect("Failed to load");
///
/// println!("API: {}", settings.api_base_url);
/// println!("Long press: {:?}", settings.long_press());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Base URL of the REST API (e.g. "https://api.example.com")
    pub api_base_url: String,
    /// URL of the live connection endpoint (e.g. "wss://api.example.com/ws")
    pub socket_url: String,
    /// Largest accepted image attachment in bytes
    pub max_image_bytes: usize,
    /// Maximum swipe offset a bubble may travel
    pub swipe_max_offset: f32,
    /// Offset above which releasing a swipe sets the reply draft
    pub swipe_commit_threshold: f32,
    /// Hold duration that enters multi-select mode
    pub long_press_ms: u64,
    /// How long a reply target stays highlighted after a reply click
    pub highlight_ms: u64,
    /// Delays after connect at which viewer checks are re-issued
    pub presence_check_delays_ms: Vec<u64>,
    /// Time after which an unreconciled optimistic send is marked failed
    pub pending_timeout_ms: u64,
    /// Timeout applied to every REST request
    pub request_timeout_ms: u64,
}

impl ChatSettings {
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

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Settings(format!("Failed to parse settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file
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

    /// Reject combinations the gesture and upload logic cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.swipe_commit_threshold > self.swipe_max_offset {
            return Err(Error::Settings(format!(
                "swipe threshold {} exceeds max offset {}",
                self.swipe_commit_threshold, self.swipe_max_offset
            )));
        }
        if self.max_image_bytes == 0 {
            return Err(Error::Settings("max_image_bytes must be positive".to_string()));
        }
        Ok(())
    }

    /// Long-press hold duration
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    /// Reply highlight duration
    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    /// Pending send timeout
    pub fn pending_timeout(&self) -> Duration {
        Duration::from_millis(self.pending_timeout_ms)
    }

    /// REST request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Viewer check delays, in the order they fire
    pub fn presence_check_delays(&self) -> Vec<Duration> {
        self.presence_check_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            socket_url: "ws://localhost:3000/ws".to_string(),
            max_image_bytes: 5 * 1024 * 1024,
            swipe_max_offset: 80.0,
            swipe_commit_threshold: 60.0,
            long_press_ms: 500,
            highlight_ms: 2000,
            presence_check_delays_ms: vec![1000, 3000],
            pending_timeout_ms: 15_000,
            request_timeout_ms: 10_000,
        }
    }
}
