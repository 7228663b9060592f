//! Forwards event records to a telemetry endpoint as JSON POSTs.
//!
//! Runs inside the reporter task, so a slow endpoint delays later events but
//! never the lifecycle. Failed deliveries are not retried.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{EventRecord, EventSink};
use crate::error::WidgetError;

pub struct HttpEventSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpEventSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, WidgetError> {
        let endpoint = Url::parse(endpoint).map_err(|e| WidgetError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WidgetError::EventDelivery(format!("Failed to build client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, record: &EventRecord) -> Result<(), WidgetError> {
        log::debug!("Event: {} {}", record.event_type, record.event_data);
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(record)
            .send()
            .await
            .map_err(|e| WidgetError::EventDelivery(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WidgetError::EventDelivery(format!(
                "endpoint returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
