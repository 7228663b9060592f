//! Remote content lookup keyed by business and customer.
//!
//! `GET {endpoint}?business_id=…&email=…` returning a `PopupContent` JSON
//! object, or `null` when there is nothing to show for this customer.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::ContentProvider;
use crate::error::WidgetError;
use crate::types::{PopupContent, WidgetConfig};

pub struct RemoteContentProvider {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteContentProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, WidgetError> {
        let endpoint = Url::parse(endpoint).map_err(|e| WidgetError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WidgetError::ContentRequest(format!("Failed to build client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    /// Lookup URL for `config`, preserving any query the endpoint already has.
    pub fn request_url(&self, config: &WidgetConfig) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("business_id", &config.business_id)
            .append_pair("email", &config.customer_email);
        url
    }
}

#[async_trait]
impl ContentProvider for RemoteContentProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn fetch(
        &self,
        config: &WidgetConfig,
        _display_name: &str,
    ) -> Result<PopupContent, WidgetError> {
        let url = self.request_url(config);
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(WidgetError::ContentStatus(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        let content = parse_content(&body)?;
        log::debug!("Fetched popup content: {}", content.title);
        Ok(content)
    }
}

/// Decode a content response body; `null` means no content.
pub fn parse_content(body: &str) -> Result<PopupContent, WidgetError> {
    let content: Option<PopupContent> =
        serde_json::from_str(body).map_err(|e| WidgetError::ContentDecode(e.to_string()))?;
    let content = content.ok_or(WidgetError::ContentMissing)?;
    content.validate()?;
    Ok(content)
}
