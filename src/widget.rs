//! Widget entry point: one initialization per script execution.
//!
//! Resolve identity → derive display name → pick content provider → start
//! the reporter and lifecycle tasks. Collaborators default from settings and
//! can be overridden before `start`.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::content::{ContentProvider, RemoteContentProvider, StaticContentProvider};
use crate::error::WidgetError;
use crate::host::{DocumentGlobalConfig, HostConfigSource, HostDocument};
use crate::identity::derive_display_name;
use crate::lifecycle::{LifecycleController, LifecycleTiming, RunOutcome};
use crate::reporter::{spawn_reporter, EventSink, HttpEventSink, LogSink};
use crate::resolver::{resolve_config, ConfigSource};
use crate::settings::WidgetSettings;
use crate::types::WidgetConfig;

pub struct Widget {
    document: Arc<dyn HostDocument>,
    settings: WidgetSettings,
    host_config: Option<Arc<dyn HostConfigSource>>,
    content_provider: Option<Arc<dyn ContentProvider>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl Widget {
    pub fn new(document: Arc<dyn HostDocument>, settings: WidgetSettings) -> Self {
        Self {
            document,
            settings,
            host_config: None,
            content_provider: None,
            event_sink: None,
        }
    }

    /// The host's global configuration object, consulted last. Without one,
    /// the document global named by `globalConfigKey` is read.
    pub fn with_host_config(mut self, source: Arc<dyn HostConfigSource>) -> Self {
        self.host_config = Some(source);
        self
    }

    pub fn with_content_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.content_provider = Some(provider);
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Run initialization and spawn the lifecycle. Must be called inside a
    /// tokio runtime. Never fails: misconfigured collaborators fall back to
    /// static content and local logging.
    pub fn start(self) -> WidgetHandle {
        log::info!("Initializing retention widget");

        let host_config = self.host_config.unwrap_or_else(|| {
            Arc::new(DocumentGlobalConfig::new(
                self.document.clone(),
                self.settings.global_config_key.clone(),
            ))
        });
        let resolution = resolve_config(
            self.document.as_ref(),
            Some(host_config.as_ref()),
            &self.settings.script_filename,
        );
        let config = resolution.config;
        let display_name = derive_display_name(&config.customer_email);

        let provider = self
            .content_provider
            .unwrap_or_else(|| default_content_provider(&self.settings));
        let sink = self
            .event_sink
            .unwrap_or_else(|| default_event_sink(&self.settings));
        log::debug!(
            "Widget using {} content and {} event sink (config from {:?})",
            provider.name(),
            sink.name(),
            resolution.source
        );

        let (reporter, reporter_task) =
            spawn_reporter(config.clone(), sink, self.settings.reporter_queue_size);

        let timing = LifecycleTiming {
            show_delay: self.settings.show_delay(),
            fade_duration: self.settings.fade_duration(),
        };
        let controller = LifecycleController::new(self.document, reporter, timing);
        let lifecycle_task = tokio::spawn(controller.run(provider, config.clone(), display_name));

        WidgetHandle {
            config,
            source: resolution.source,
            lifecycle_task,
            reporter_task,
        }
    }
}

fn default_content_provider(settings: &WidgetSettings) -> Arc<dyn ContentProvider> {
    let Some(endpoint) = settings.content_endpoint.as_deref() else {
        return Arc::new(StaticContentProvider);
    };
    match RemoteContentProvider::new(endpoint, settings.request_timeout()) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            log::warn!("Remote content disabled: {}", e);
            Arc::new(StaticContentProvider)
        }
    }
}

fn default_event_sink(settings: &WidgetSettings) -> Arc<dyn EventSink> {
    let Some(endpoint) = settings.event_endpoint.as_deref() else {
        return Arc::new(LogSink);
    };
    match HttpEventSink::new(endpoint, settings.request_timeout()) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            log::warn!("Remote event sink disabled: {}", e);
            Arc::new(LogSink)
        }
    }
}

/// Handle to a started widget.
pub struct WidgetHandle {
    config: WidgetConfig,
    source: ConfigSource,
    lifecycle_task: JoinHandle<RunOutcome>,
    reporter_task: JoinHandle<()>,
}

impl WidgetHandle {
    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn config_source(&self) -> ConfigSource {
        self.source
    }

    pub fn is_finished(&self) -> bool {
        self.lifecycle_task.is_finished()
    }

    /// Wait for the lifecycle to end and the reporter to flush.
    pub async fn finished(self) -> Result<RunOutcome, WidgetError> {
        let outcome = self
            .lifecycle_task
            .await
            .map_err(|e| WidgetError::TaskFailed(format!("lifecycle: {}", e)))?;
        if let Err(e) = self.reporter_task.await {
            log::warn!("Event reporter task failed: {}", e);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{JsonHostConfig, MemoryDocument, ScriptElement};
    use crate::markup::{CLOSE_BUTTON_ID, POPUP_ROOT_ID, TITLE_ID};
    use crate::reporter::testing::RecordingSink;
    use crate::types::SENTINEL;
    use serde_json::json;
    use std::time::Duration;

    fn embedding_script() -> ScriptElement {
        ScriptElement::new(Some("https://cdn.pulse.example/pulse-retention-widget.js"))
            .with_attribute("data-business-id", "biz-42")
            .with_attribute("data-email", "alice@example.com")
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_personalized_popup() {
        let doc = Arc::new(MemoryDocument::new());
        doc.execute_script(embedding_script());
        let sink = Arc::new(RecordingSink::default());

        let handle = Widget::new(doc.clone(), WidgetSettings::default())
            .with_event_sink(sink.clone())
            .start();
        assert_eq!(handle.config().business_id, "biz-42");
        assert_eq!(handle.config_source(), ConfigSource::CurrentScript);

        tokio::time::sleep(Duration::from_millis(900)).await;
        let html = doc.html_of(TITLE_ID).unwrap();
        assert!(html.contains("Hello Alice!"));

        doc.click(CLOSE_BUTTON_ID);
        assert_eq!(handle.finished().await.unwrap(), RunOutcome::Completed);
        assert_eq!(doc.count_elements(POPUP_ROOT_ID), 0);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.business_id == "biz-42"));
        assert!(records.iter().all(|r| r.customer_email == "alice@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_inclusion_shows_single_instance() {
        let doc = Arc::new(MemoryDocument::new());
        doc.execute_script(embedding_script());
        let sink = Arc::new(RecordingSink::default());

        let first = Widget::new(doc.clone(), WidgetSettings::default())
            .with_event_sink(sink.clone())
            .start();
        let second = Widget::new(doc.clone(), WidgetSettings::default())
            .with_event_sink(sink.clone())
            .start();

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(doc.count_elements(POPUP_ROOT_ID), 1);
        // Both timers fire at the same instant; whichever runs second backs off.
        assert!(first.is_finished() ^ second.is_finished());

        doc.click(POPUP_ROOT_ID);
        let mut outcomes = vec![
            first.finished().await.unwrap(),
            second.finished().await.unwrap(),
        ];
        outcomes.sort_by_key(|o| *o == RunOutcome::Completed);
        assert_eq!(outcomes, vec![RunOutcome::AlreadyPresent, RunOutcome::Completed]);
        assert_eq!(doc.count_elements(POPUP_ROOT_ID), 0);
        assert_eq!(sink.event_types(), vec!["popup_shown", "popup_closed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinit_during_fade_does_not_duplicate() {
        let doc = Arc::new(MemoryDocument::new());
        let first = Widget::new(doc.clone(), WidgetSettings::default()).start();
        tokio::time::sleep(Duration::from_millis(900)).await;
        doc.click(CLOSE_BUTTON_ID);

        // Second initialization fires its show timer while the first popup fades.
        let settings = WidgetSettings {
            show_delay_ms: 100,
            ..WidgetSettings::default()
        };
        let second = Widget::new(doc.clone(), settings).start();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(doc.count_elements(POPUP_ROOT_ID), 1);

        assert_eq!(second.finished().await.unwrap(), RunOutcome::AlreadyPresent);
        assert_eq!(first.finished().await.unwrap(), RunOutcome::Completed);
        assert_eq!(doc.count_elements(POPUP_ROOT_ID), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_config_fallback_and_sentinels() {
        let doc = Arc::new(MemoryDocument::new());
        let handle = Widget::new(doc.clone(), WidgetSettings::default())
            .with_host_config(Arc::new(JsonHostConfig::new(r#"{"email":"bob"}"#)))
            .start();
        assert_eq!(handle.config_source(), ConfigSource::HostGlobal);
        assert_eq!(handle.config().business_id, SENTINEL);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(doc.html_of(TITLE_ID).unwrap().contains("Hello Bob!"));
        doc.click(CLOSE_BUTTON_ID);
        assert_eq!(handle.finished().await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_customer_greeting() {
        let doc = Arc::new(MemoryDocument::new());
        let handle = Widget::new(doc.clone(), WidgetSettings::default()).start();
        assert_eq!(handle.config_source(), ConfigSource::Defaults);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(doc
            .html_of(TITLE_ID)
            .unwrap()
            .contains("Hello Valued Customer!"));
        doc.click(POPUP_ROOT_ID);
        assert_eq!(handle.finished().await.unwrap(), RunOutcome::Completed);
    }

    #[test]
    fn test_bad_endpoints_fall_back() {
        let settings = WidgetSettings {
            content_endpoint: Some("not a url".into()),
            event_endpoint: Some("also not".into()),
            ..WidgetSettings::default()
        };
        assert_eq!(default_content_provider(&settings).name(), "static");
        assert_eq!(default_event_sink(&settings).name(), "log");
    }

    #[test]
    fn test_configured_endpoints_are_used() {
        let settings = WidgetSettings {
            content_endpoint: Some("https://api.pulse.example/content".into()),
            event_endpoint: Some("https://api.pulse.example/events".into()),
            ..WidgetSettings::default()
        };
        assert_eq!(default_content_provider(&settings).name(), "remote");
        assert_eq!(default_event_sink(&settings).name(), "http");
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_global_under_default_key() {
        let doc = Arc::new(MemoryDocument::new());
        doc.set_global(
            "__PULSE_WIDGET_DATA__",
            json!({"businessId": "biz-5", "email": "carol@example.com"}),
        );
        let handle = Widget::new(doc.clone(), WidgetSettings::default()).start();
        assert_eq!(handle.config_source(), ConfigSource::HostGlobal);
        assert_eq!(handle.config().business_id, "biz-5");

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(doc.html_of(TITLE_ID).unwrap().contains("Hello Carol!"));
        doc.click(CLOSE_BUTTON_ID);
        assert_eq!(handle.finished().await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_global_under_custom_key() {
        let doc = Arc::new(MemoryDocument::new());
        doc.set_global("__PULSE_WIDGET_DATA__", json!({"businessId": "ignored"}));
        doc.set_global("__SHOP_PULSE__", json!({"businessId": "biz-6"}));
        let settings = WidgetSettings {
            global_config_key: "__SHOP_PULSE__".into(),
            ..WidgetSettings::default()
        };
        let handle = Widget::new(doc.clone(), settings).start();
        assert_eq!(handle.config_source(), ConfigSource::HostGlobal);
        assert_eq!(handle.config().business_id, "biz-6");
        assert_eq!(handle.config().customer_email, SENTINEL);

        tokio::time::sleep(Duration::from_millis(900)).await;
        doc.click(POPUP_ROOT_ID);
        assert_eq!(handle.finished().await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_panicked_lifecycle_is_task_failure() {
        let handle = WidgetHandle {
            config: WidgetConfig::unknown(),
            source: ConfigSource::Defaults,
            lifecycle_task: tokio::spawn(async { panic!("lifecycle blew up") }),
            reporter_task: tokio::spawn(async {}),
        };
        let err = handle.finished().await.unwrap_err();
        assert!(matches!(err, WidgetError::TaskFailed(_)));
        assert_eq!(err.reason_code(), "task_failed");
    }
}
