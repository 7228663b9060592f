//! Popup event reporting.
//!
//! Call sites hold an [`EventReporter`] and call `report`, which stamps the
//! event and pushes it onto a bounded queue without waiting. A background
//! task drains the queue into an [`EventSink`]; swapping the local log sink
//! for a networked one changes nothing at the call sites.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::error::WidgetError;
use crate::types::{CloseReason, WidgetConfig};

pub use http::HttpEventSink;

/// Lifecycle and interaction events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    Shown { title: String },
    Closed { reason: CloseReason },
    CtaClicked { cta_text: String, cta_link: String },
    ContentUnavailable { reason: &'static str },
}

impl PopupEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            PopupEvent::Shown { .. } => "popup_shown",
            PopupEvent::Closed { .. } => "popup_closed",
            PopupEvent::CtaClicked { .. } => "popup_cta_clicked",
            PopupEvent::ContentUnavailable { .. } => "popup_content_unavailable",
        }
    }

    pub fn data(&self) -> Value {
        match self {
            PopupEvent::Shown { title } => json!({ "title": title }),
            PopupEvent::Closed { reason } => json!({ "action": reason.as_str() }),
            PopupEvent::CtaClicked { cta_text, cta_link } => {
                json!({ "cta_text": cta_text, "cta_link": cta_link })
            }
            PopupEvent::ContentUnavailable { reason } => json!({ "reason": reason }),
        }
    }
}

/// Wire shape accepted by telemetry collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub business_id: String,
    pub customer_email: String,
    pub event_type: String,
    pub event_data: Value,
    /// RFC 3339 UTC with millisecond precision, captured when the event was
    /// reported.
    pub timestamp: String,
}

impl EventRecord {
    pub fn new(config: &WidgetConfig, event: &PopupEvent) -> Self {
        Self {
            business_id: config.business_id.clone(),
            customer_email: config.customer_email.clone(),
            event_type: event.event_type().to_string(),
            event_data: event.data(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Destination for event records.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    async fn deliver(&self, record: &EventRecord) -> Result<(), WidgetError>;
}

/// Logs every event locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, record: &EventRecord) -> Result<(), WidgetError> {
        log::info!("Event: {} {}", record.event_type, record.event_data);
        Ok(())
    }
}

/// Cloneable, non-blocking handle for reporting events.
#[derive(Clone)]
pub struct EventReporter {
    config: Arc<WidgetConfig>,
    sender: mpsc::Sender<EventRecord>,
}

impl EventReporter {
    /// Stamp and enqueue an event. Never blocks, never fails: a full or
    /// closed queue drops the event with a log line.
    pub fn report(&self, event: PopupEvent) {
        let record = EventRecord::new(&self.config, &event);
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                log::warn!("Event queue full, dropping {}", record.event_type);
            }
            Err(TrySendError::Closed(record)) => {
                log::debug!("Event reporter stopped, dropping {}", record.event_type);
            }
        }
    }
}

/// Start the background reporter task.
///
/// The task exits once every [`EventReporter`] clone is dropped and the
/// queue has been drained.
pub fn spawn_reporter(
    config: WidgetConfig,
    sink: Arc<dyn EventSink>,
    queue_size: usize,
) -> (EventReporter, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<EventRecord>(queue_size.max(1));
    let handle = tokio::spawn(async move {
        while let Some(record) = receiver.recv().await {
            if let Err(e) = sink.deliver(&record).await {
                log::warn!("Failed to deliver {} event: {}", record.event_type, e);
            }
        }
        log::debug!("Event reporter drained");
    });
    let reporter = EventReporter {
        config: Arc::new(config),
        sender,
    };
    (reporter, handle)
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn deliver(&self, _record: &EventRecord) -> Result<(), WidgetError> {
            Err(WidgetError::EventDelivery("offline".into()))
        }
    }

    fn config() -> WidgetConfig {
        WidgetConfig::from_signals(Some("biz-1"), Some("alice@example.com")).unwrap()
    }

    #[test]
    fn test_event_wire_shape() {
        let closed = PopupEvent::Closed {
            reason: CloseReason::OverlayClick,
        };
        assert_eq!(closed.event_type(), "popup_closed");
        assert_eq!(closed.data(), json!({ "action": "overlay_click" }));

        let cta = PopupEvent::CtaClicked {
            cta_text: "Claim".into(),
            cta_link: "#".into(),
        };
        assert_eq!(cta.data(), json!({ "cta_text": "Claim", "cta_link": "#" }));

        let record = EventRecord::new(&config(), &closed);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["business_id"], "biz-1");
        assert_eq!(value["customer_email"], "alice@example.com");
        assert_eq!(value["event_type"], "popup_closed");
        assert_eq!(value["event_data"]["action"], "overlay_click");
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
    }

    #[test]
    fn test_timestamp_is_utc_millis() {
        let record = EventRecord::new(&config(), &PopupEvent::Shown { title: "t".into() });
        // e.g. 2026-10-19T08:15:42.123Z
        assert!(record.timestamp.ends_with('Z'));
        let (_, fraction) = record.timestamp.rsplit_once('.').unwrap();
        assert_eq!(fraction.len(), 4);
        assert!(fraction[..3].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_reporter_delivers_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let (reporter, handle) = spawn_reporter(config(), sink.clone(), 8);
        reporter.report(PopupEvent::Shown {
            title: "Hello Alice!".into(),
        });
        reporter.report(PopupEvent::Closed {
            reason: CloseReason::CloseButton,
        });
        drop(reporter);
        handle.await.unwrap();

        assert_eq!(sink.event_types(), vec!["popup_shown", "popup_closed"]);
        assert_eq!(sink.records()[0].event_data["title"], "Hello Alice!");
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let sink = Arc::new(RecordingSink::default());
        let (reporter, handle) = spawn_reporter(config(), sink.clone(), 1);
        // Nothing yields between these, so the reporter task cannot drain.
        reporter.report(PopupEvent::Shown { title: "a".into() });
        reporter.report(PopupEvent::Shown { title: "b".into() });
        drop(reporter);
        handle.await.unwrap();
        assert_eq!(sink.records().len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let (reporter, handle) = spawn_reporter(config(), Arc::new(FailingSink), 4);
        reporter.report(PopupEvent::ContentUnavailable { reason: "no_content" });
        drop(reporter);
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_report_after_shutdown_is_noop() {
        let (reporter, handle) = spawn_reporter(config(), Arc::new(LogSink), 4);
        handle.abort();
        let _ = handle.await;
        reporter.report(PopupEvent::Shown { title: "late".into() });
    }
}
