//! Popup content providers.
//!
//! The lifecycle controller only sees [`ContentProvider`]; whether content is
//! compiled in or fetched per business/customer is an injection decision.

pub mod remote;

use async_trait::async_trait;

use crate::error::WidgetError;
use crate::types::{PopupContent, WidgetConfig};

pub use remote::RemoteContentProvider;

pub const DEFAULT_CTA_TEXT: &str = "Claim Your Offer";
pub const DEFAULT_CTA_LINK: &str = "#";

const OFFER_MESSAGE: &str = r#"<p><strong>We have exclusive offers just for you!!</strong></p>
<ul>
  <li>🚗 Get <strong>₹200 OFF</strong> on your next ride</li>
  <li>🍕 <strong>50% OFF</strong> on food delivery (up to ₹150)</li>
  <li>📦 <strong>FREE delivery</strong> on your next grocery order</li>
</ul>
<p>As you are our special customer, these offers are exclusively for you!</p>"#;

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Produce the content to render for this page load.
    ///
    /// Any error means "do not render".
    async fn fetch(
        &self,
        config: &WidgetConfig,
        display_name: &str,
    ) -> Result<PopupContent, WidgetError>;
}

/// The built-in offer, greeting the customer by display name.
pub fn personalized_content(display_name: &str) -> PopupContent {
    PopupContent {
        title: format!("Hello {}!", display_name),
        message: OFFER_MESSAGE.to_string(),
        cta_text: DEFAULT_CTA_TEXT.to_string(),
        cta_link: DEFAULT_CTA_LINK.to_string(),
    }
}

/// Compiled-in content; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticContentProvider;

#[async_trait]
impl ContentProvider for StaticContentProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(
        &self,
        _config: &WidgetConfig,
        display_name: &str,
    ) -> Result<PopupContent, WidgetError> {
        Ok(personalized_content(display_name))
    }
}
