use serde::{Deserialize, Serialize};

use crate::error::WidgetError;

/// Fallback value for any identity field the host page did not provide.
pub const SENTINEL: &str = "UNKNOWN";

/// Identity resolved from the host page, fixed for the lifetime of a page load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub business_id: String,
    pub customer_email: String,
}

impl WidgetConfig {
    /// Both fields set to the sentinel.
    pub fn unknown() -> Self {
        Self {
            business_id: SENTINEL.to_string(),
            customer_email: SENTINEL.to_string(),
        }
    }

    /// Build a config from raw host signals.
    ///
    /// Empty values count as absent. Returns `None` when neither field carries
    /// a value; otherwise the missing field is filled with the sentinel.
    pub fn from_signals(business_id: Option<&str>, customer_email: Option<&str>) -> Option<Self> {
        let business_id = business_id.filter(|v| !v.is_empty());
        let customer_email = customer_email.filter(|v| !v.is_empty());
        if business_id.is_none() && customer_email.is_none() {
            return None;
        }
        Some(Self {
            business_id: business_id.unwrap_or(SENTINEL).to_string(),
            customer_email: customer_email.unwrap_or(SENTINEL).to_string(),
        })
    }

    pub fn is_unknown(&self) -> bool {
        self.business_id == SENTINEL && self.customer_email == SENTINEL
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Content model rendered into the overlay.
///
/// Field names follow the content endpoint's wire format (`cta_text`, `cta_link`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    pub title: String,
    /// Rich text (HTML), inserted into the message body as-is.
    pub message: String,
    pub cta_text: String,
    pub cta_link: String,
}

impl PopupContent {
    /// Reject content that would render as a broken overlay.
    pub fn validate(&self) -> Result<(), WidgetError> {
        if self.title.trim().is_empty() {
            return Err(WidgetError::MalformedContent("empty title".to_string()));
        }
        if self.cta_text.trim().is_empty() {
            return Err(WidgetError::MalformedContent("empty cta_text".to_string()));
        }
        Ok(())
    }
}

/// Lifecycle of the singleton overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Waiting for the host document to finish parsing.
    Idle,
    /// Show timer armed.
    Scheduled,
    /// Overlay attached and interactive.
    Shown,
    /// Fade applied, removal pending.
    Closing,
    /// Overlay detached. Terminal.
    Removed,
}

/// Why the overlay was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    CloseButton,
    OverlayClick,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::CloseButton => "close_button",
            CloseReason::OverlayClick => "overlay_click",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_signals_both_present() {
        let config = WidgetConfig::from_signals(Some("biz-1"), Some("a@b.com")).unwrap();
        assert_eq!(config.business_id, "biz-1");
        assert_eq!(config.customer_email, "a@b.com");
    }

    #[test]
    fn test_from_signals_partial_fills_sentinel() {
        let config = WidgetConfig::from_signals(None, Some("a@b.com")).unwrap();
        assert_eq!(config.business_id, SENTINEL);

        let config = WidgetConfig::from_signals(Some("biz-1"), Some("")).unwrap();
        assert_eq!(config.customer_email, SENTINEL);
    }

    #[test]
    fn test_from_signals_empty_is_none() {
        assert!(WidgetConfig::from_signals(None, None).is_none());
        assert!(WidgetConfig::from_signals(Some(""), Some("")).is_none());
    }

    #[test]
    fn test_content_validation() {
        let mut content = PopupContent {
            title: "Hello!".into(),
            message: "<p>hi</p>".into(),
            cta_text: "Go".into(),
            cta_link: "#".into(),
        };
        assert!(content.validate().is_ok());
        content.title = "  ".into();
        assert!(content.validate().is_err());
    }

    #[test]
    fn test_content_wire_format() {
        let json = r##"{"title":"T","message":"<b>m</b>","cta_text":"Go","cta_link":"#"}"##;
        let content: PopupContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.cta_text, "Go");
        assert_eq!(content.cta_link, "#");
    }

    #[test]
    fn test_close_reason_wire_names() {
        assert_eq!(CloseReason::CloseButton.as_str(), "close_button");
        assert_eq!(
            serde_json::to_value(CloseReason::OverlayClick).unwrap(),
            serde_json::json!("overlay_click")
        );
    }
}
