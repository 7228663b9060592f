//! Error types for the retention widget
//!
//! Errors are classified by where they surface:
//! - Host: the embedding page could not answer a question (script scan, global config)
//! - Content: the content provider could not produce something renderable
//! - Lifecycle: a transition was requested from the wrong state, or a
//!   background task died
//!
//! None of these ever reach the host page's visitors. Callers log them and
//! degrade to "no popup".

use thiserror::Error;

use crate::types::LifecycleState;

/// Failures raised by a host document or host configuration source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("Script elements unavailable: {0}")]
    ScriptsUnavailable(String),

    #[error("Host configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Host configuration malformed: {0}")]
    MalformedConfig(String),

    #[error("Document body unavailable")]
    BodyUnavailable,
}

/// Error types for widget startup, content lookup and lifecycle transitions
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    // Content provider failures
    #[error("Content request failed: {0}")]
    ContentRequest(String),

    #[error("Content endpoint returned status {0}")]
    ContentStatus(u16),

    #[error("Failed to decode content: {0}")]
    ContentDecode(String),

    #[error("No popup content available")]
    ContentMissing,

    #[error("Malformed popup content: {0}")]
    MalformedContent(String),

    // Configuration
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Settings error: {0}")]
    Settings(String),

    // Event delivery
    #[error("Event delivery failed: {0}")]
    EventDelivery(String),

    // Lifecycle
    #[error("Cannot {action} while {from:?}")]
    InvalidTransition {
        from: LifecycleState,
        action: &'static str,
    },

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl WidgetError {
    /// Stable short code, used as the `reason` of `popup_content_unavailable`.
    pub fn reason_code(&self) -> &'static str {
        match self {
            WidgetError::Host(_) => "host",
            WidgetError::ContentRequest(_) => "request_failed",
            WidgetError::ContentStatus(_) => "bad_status",
            WidgetError::ContentDecode(_) => "undecodable",
            WidgetError::ContentMissing => "no_content",
            WidgetError::MalformedContent(_) => "malformed",
            WidgetError::InvalidEndpoint { .. } => "invalid_endpoint",
            WidgetError::Settings(_) => "settings",
            WidgetError::EventDelivery(_) => "event_delivery",
            WidgetError::InvalidTransition { .. } => "invalid_transition",
            WidgetError::TaskFailed(_) => "task_failed",
        }
    }
}

impl From<std::io::Error> for WidgetError {
    fn from(err: std::io::Error) -> Self {
        WidgetError::Settings(err.to_string())
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WidgetError::ContentDecode(err.to_string())
        } else {
            WidgetError::ContentRequest(err.to_string())
        }
    }
}
