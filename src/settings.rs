//! Widget settings stored in ~/.pulse/widget.json
//!
//! Every field has a default, so an empty object (or no file at all) is a
//! valid configuration. `$PULSE_WIDGET_CONFIG` overrides the location.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WidgetError;

/// Environment variable pointing at an alternative settings file.
pub const SETTINGS_ENV_VAR: &str = "PULSE_WIDGET_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSettings {
    /// Delay between parse completion and rendering, to avoid flicker during load.
    #[serde(default = "default_show_delay_ms")]
    pub show_delay_ms: u64,
    /// Fade time between close and detach.
    #[serde(default = "default_fade_duration_ms")]
    pub fade_duration_ms: u64,
    /// Filename matched against script `src` during the fallback scan.
    #[serde(default = "default_script_filename")]
    pub script_filename: String,
    /// Name of the global object a host page may publish.
    #[serde(default = "default_global_config_key")]
    pub global_config_key: String,
    /// Remote content lookup. Static content when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_endpoint: Option<String>,
    /// Remote event sink. Local logging when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_endpoint: Option<String>,
    #[serde(default = "default_reporter_queue_size")]
    pub reporter_queue_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_show_delay_ms() -> u64 {
    800
}

fn default_fade_duration_ms() -> u64 {
    300
}

fn default_script_filename() -> String {
    "pulse-retention-widget.js".to_string()
}

fn default_global_config_key() -> String {
    "__PULSE_WIDGET_DATA__".to_string()
}

fn default_reporter_queue_size() -> usize {
    64
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            show_delay_ms: default_show_delay_ms(),
            fade_duration_ms: default_fade_duration_ms(),
            script_filename: default_script_filename(),
            global_config_key: default_global_config_key(),
            content_endpoint: None,
            event_endpoint: None,
            reporter_queue_size: default_reporter_queue_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WidgetSettings {
    pub fn show_delay(&self) -> Duration {
        Duration::from_millis(self.show_delay_ms)
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load settings from `path`. Missing or malformed files are errors.
    pub fn load(path: &Path) -> Result<Self, WidgetError> {
        let content = fs::read_to_string(path).map_err(|e| {
            WidgetError::Settings(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let settings: WidgetSettings = serde_json::from_str(&content).map_err(|e| {
            WidgetError::Settings(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from the default location, falling back to defaults.
    ///
    /// Never fails: widget startup must not depend on a settings file.
    pub fn load_or_default() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        Self::load_from_or_default(&path)
    }

    pub fn load_from_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No widget settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring widget settings: {}", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), WidgetError> {
        if self.script_filename.trim().is_empty() {
            return Err(WidgetError::Settings("scriptFilename must not be empty".into()));
        }
        if self.reporter_queue_size == 0 {
            return Err(WidgetError::Settings("reporterQueueSize must be at least 1".into()));
        }
        Ok(())
    }
}

/// `$PULSE_WIDGET_CONFIG`, else `~/.pulse/widget.json`.
pub fn settings_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(SETTINGS_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::home_dir().map(|home| home.join(".pulse").join("widget.json"))
}
