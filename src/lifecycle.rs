//! Singleton overlay lifecycle.
//!
//! `Idle → Scheduled → Shown → Closing → Removed`, one controller per page
//! load. Each transition is a guarded method; [`LifecycleController::run`]
//! drives them from parse completion, the show/fade timers and clicks.
//!
//! The existence check in `show` is the only guard against a second overlay
//! (double inclusion, re-initialization). It also covers the fade window,
//! since the element stays attached until `remove`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::content::ContentProvider;
use crate::error::WidgetError;
use crate::host::{ClickEvent, HostDocument, ReadyState};
use crate::markup::{build_overlay, CLOSE_BUTTON_ID, CTA_BUTTON_ID, POPUP_ROOT_ID};
use crate::reporter::{EventReporter, PopupEvent};
use crate::types::{CloseReason, LifecycleState, PopupContent, WidgetConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTiming {
    pub show_delay: Duration,
    pub fade_duration: Duration,
}

impl Default for LifecycleTiming {
    fn default() -> Self {
        Self {
            show_delay: Duration::from_millis(800),
            fade_duration: Duration::from_millis(300),
        }
    }
}

/// Result of the Scheduled → Shown attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    Rendered,
    /// Another instance is already in the document; nothing was created.
    AlreadyPresent,
}

/// How a controller run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Shown, closed and removed.
    Completed,
    AlreadyPresent,
    ContentUnavailable,
    RenderFailed,
    /// The overlay disappeared before it was closed.
    Detached,
    /// The page went away before parsing finished.
    Abandoned,
}

pub struct LifecycleController {
    document: Arc<dyn HostDocument>,
    reporter: EventReporter,
    timing: LifecycleTiming,
    state: LifecycleState,
    content: Option<PopupContent>,
    interactions: Option<mpsc::UnboundedReceiver<ClickEvent>>,
}

impl LifecycleController {
    pub fn new(
        document: Arc<dyn HostDocument>,
        reporter: EventReporter,
        timing: LifecycleTiming,
    ) -> Self {
        Self {
            document,
            reporter,
            timing,
            state: LifecycleState::Idle,
            content: None,
            interactions: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn require_state(&self, expected: LifecycleState, action: &'static str) -> Result<(), WidgetError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WidgetError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// One-shot wait for parse completion, or `None` if the document is
    /// already parsed. The receiver errors if the page is torn down first.
    pub fn parse_wait(&self) -> Option<oneshot::Receiver<()>> {
        if self.document.ready_state() != ReadyState::Loading {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.document.on_parsed(tx);
        Some(rx)
    }

    /// Idle → Scheduled.
    pub fn schedule(&mut self) -> Result<(), WidgetError> {
        self.require_state(LifecycleState::Idle, "schedule")?;
        self.state = LifecycleState::Scheduled;
        log::info!("Popup will appear in {}ms", self.timing.show_delay.as_millis());
        Ok(())
    }

    /// Scheduled → Shown, unless an instance already exists.
    pub fn show(&mut self, content: PopupContent) -> Result<ShowOutcome, WidgetError> {
        self.require_state(LifecycleState::Scheduled, "show")?;

        if self.document.contains_element(POPUP_ROOT_ID) {
            log::info!("Popup already exists, skipping render");
            return Ok(ShowOutcome::AlreadyPresent);
        }

        self.document.append_to_body(build_overlay(&content))?;
        log::info!("Popup rendered");

        let (tx, rx) = mpsc::unbounded_channel();
        for id in [CLOSE_BUTTON_ID, CTA_BUTTON_ID, POPUP_ROOT_ID] {
            if !self.document.add_click_listener(id, tx.clone()) {
                log::warn!("Popup element #{} missing, handler not attached", id);
            }
        }

        self.reporter.report(PopupEvent::Shown {
            title: content.title.clone(),
        });
        self.content = Some(content);
        self.interactions = Some(rx);
        self.state = LifecycleState::Shown;
        Ok(ShowOutcome::Rendered)
    }

    /// Report a call-to-action click. Does not close the overlay.
    pub fn cta_clicked(&self) -> Result<(), WidgetError> {
        self.require_state(LifecycleState::Shown, "report cta click")?;
        if let Some(content) = &self.content {
            self.reporter.report(PopupEvent::CtaClicked {
                cta_text: content.cta_text.clone(),
                cta_link: content.cta_link.clone(),
            });
        }
        Ok(())
    }

    /// Shown → Closing: start the fade and report the close.
    pub fn close(&mut self, reason: CloseReason) -> Result<(), WidgetError> {
        self.require_state(LifecycleState::Shown, "close")?;
        if !self.document.set_style(POPUP_ROOT_ID, "opacity", "0") {
            log::debug!("Popup gone before fade");
        }
        self.state = LifecycleState::Closing;
        self.reporter.report(PopupEvent::Closed { reason });
        Ok(())
    }

    /// Closing → Removed: detach the overlay.
    pub fn remove(&mut self) -> Result<(), WidgetError> {
        self.require_state(LifecycleState::Closing, "remove")?;
        self.document.remove_element(POPUP_ROOT_ID);
        self.state = LifecycleState::Removed;
        self.interactions = None;
        log::info!("Popup closed and removed");
        Ok(())
    }

    /// Map a click to a lifecycle action. Only acts while `Shown`.
    pub fn handle_click(&mut self, event: &ClickEvent) -> Result<(), WidgetError> {
        if self.state != LifecycleState::Shown {
            return Ok(());
        }
        match event.current_target.as_str() {
            CLOSE_BUTTON_ID => self.close(CloseReason::CloseButton),
            CTA_BUTTON_ID => self.cta_clicked(),
            // Clicks inside the panel bubble up here too; only the backdrop closes.
            POPUP_ROOT_ID if event.target == POPUP_ROOT_ID => self.close(CloseReason::OverlayClick),
            _ => Ok(()),
        }
    }

    /// Drive the full lifecycle to a terminal outcome.
    pub async fn run(
        mut self,
        provider: Arc<dyn ContentProvider>,
        config: WidgetConfig,
        display_name: String,
    ) -> RunOutcome {
        if let Some(parsed) = self.parse_wait() {
            if parsed.await.is_err() {
                log::debug!("Document unloaded before parsing finished");
                return RunOutcome::Abandoned;
            }
        }
        if let Err(e) = self.schedule() {
            log::warn!("Popup not scheduled: {}", e);
            return RunOutcome::RenderFailed;
        }

        tokio::time::sleep(self.timing.show_delay).await;

        let content = match provider.fetch(&config, &display_name).await {
            Ok(content) => content,
            Err(e) => {
                log::warn!("No popup content available: {}", e);
                self.reporter.report(PopupEvent::ContentUnavailable {
                    reason: e.reason_code(),
                });
                return RunOutcome::ContentUnavailable;
            }
        };

        match self.show(content) {
            Ok(ShowOutcome::Rendered) => {}
            Ok(ShowOutcome::AlreadyPresent) => return RunOutcome::AlreadyPresent,
            Err(e) => {
                log::warn!("Popup render failed: {}", e);
                return RunOutcome::RenderFailed;
            }
        }

        let Some(mut interactions) = self.interactions.take() else {
            return RunOutcome::RenderFailed;
        };
        while self.state == LifecycleState::Shown {
            match interactions.recv().await {
                Some(event) => {
                    if let Err(e) = self.handle_click(&event) {
                        log::warn!("Ignoring click on #{}: {}", event.current_target, e);
                    }
                }
                None => break,
            }
        }
        drop(interactions);

        if self.state != LifecycleState::Closing {
            log::info!("Popup detached by host page");
            self.state = LifecycleState::Removed;
            return RunOutcome::Detached;
        }

        tokio::time::sleep(self.timing.fade_duration).await;
        match self.remove() {
            Ok(()) => RunOutcome::Completed,
            Err(e) => {
                log::warn!("Popup removal failed: {}", e);
                RunOutcome::Detached
            }
        }
    }
}
