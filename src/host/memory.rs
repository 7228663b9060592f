//! In-memory host document.
//!
//! Models just enough of a page for the widget: parse state, script
//! elements, a body of element trees, inline styles and click listeners with
//! bubbling. Used headless by the simulator and throughout the tests.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use super::{ClickEvent, HostDocument, InteractionSender, ReadyState, ScriptElement};
use crate::error::HostError;
use crate::markup::Element;

#[derive(Default)]
struct DocumentInner {
    ready_state: Option<ReadyState>,
    parse_waiters: Vec<oneshot::Sender<()>>,
    current_script: Option<ScriptElement>,
    scripts: Vec<ScriptElement>,
    scan_failure: Option<String>,
    body_detached: bool,
    body: Vec<Element>,
    styles: HashMap<String, HashMap<String, String>>,
    listeners: HashMap<String, Vec<InteractionSender>>,
    globals: HashMap<String, Value>,
}

impl DocumentInner {
    fn ready_state(&self) -> ReadyState {
        self.ready_state.unwrap_or(ReadyState::Complete)
    }

    fn find_root(&self, id: &str) -> Option<&Element> {
        self.body.iter().find(|el| el.contains_id(id))
    }
}

/// Thread-safe in-memory document. Non-poisoning locks so a panicking test
/// listener cannot wedge the document.
#[derive(Default)]
pub struct MemoryDocument {
    inner: Mutex<DocumentInner>,
}

impl MemoryDocument {
    /// A fully parsed, empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// A document still being parsed; call [`finish_parsing`](Self::finish_parsing).
    pub fn loading() -> Self {
        let doc = Self::default();
        doc.inner.lock().ready_state = Some(ReadyState::Loading);
        doc
    }

    /// Mark parsing complete and wake every registered waiter.
    pub fn finish_parsing(&self) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.ready_state = Some(ReadyState::Interactive);
            std::mem::take(&mut inner.parse_waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }

    /// Drop pending parse waiters without firing them (page torn down).
    pub fn unload(&self) {
        self.inner.lock().parse_waiters.clear();
    }

    /// Append a script element and make it the currently executing one.
    pub fn execute_script(&self, script: ScriptElement) {
        let mut inner = self.inner.lock();
        inner.scripts.push(script.clone());
        inner.current_script = Some(script);
    }

    /// Append a script element that is not currently executing.
    pub fn add_script(&self, script: ScriptElement) {
        self.inner.lock().scripts.push(script);
    }

    pub fn clear_current_script(&self) {
        self.inner.lock().current_script = None;
    }

    /// Make `scripts()` fail with the given message.
    pub fn fail_script_scan(&self, message: &str) {
        self.inner.lock().scan_failure = Some(message.to_string());
    }

    /// Publish a page-global value, as a host script would before loading
    /// the widget.
    pub fn set_global(&self, key: &str, value: Value) {
        self.inner.lock().globals.insert(key.to_string(), value);
    }

    /// Make `append_to_body` fail as if the page had no body.
    pub fn detach_body(&self) {
        self.inner.lock().body_detached = true;
    }

    /// Number of elements in the body carrying `id` (duplicates included).
    pub fn count_elements(&self, id: &str) -> usize {
        self.inner
            .lock()
            .body
            .iter()
            .map(|root| root.ids().iter().filter(|i| *i == id).count())
            .sum()
    }

    /// Serialized HTML of the body root containing `id`.
    pub fn html_of(&self, id: &str) -> Option<String> {
        self.inner.lock().find_root(id).map(Element::to_html)
    }

    pub fn style(&self, id: &str, property: &str) -> Option<String> {
        self.inner
            .lock()
            .styles
            .get(id)
            .and_then(|props| props.get(property).cloned())
    }

    pub fn listener_count(&self, id: &str) -> usize {
        self.inner.lock().listeners.get(id).map_or(0, Vec::len)
    }

    /// Simulate a user click on the element with `id`.
    ///
    /// The click bubbles from the target to its outermost ancestor; every
    /// listener along the way receives it. Returns false if no element has `id`.
    pub fn click(&self, id: &str) -> bool {
        let deliveries: Vec<(InteractionSender, ClickEvent)> = {
            let inner = self.inner.lock();
            let Some(path) = inner.body.iter().find_map(|root| root.id_path(id)) else {
                return false;
            };
            path.iter()
                .rev()
                .flat_map(|current| {
                    inner
                        .listeners
                        .get(current)
                        .into_iter()
                        .flatten()
                        .map(move |sender| {
                            (
                                sender.clone(),
                                ClickEvent {
                                    target: id.to_string(),
                                    current_target: current.clone(),
                                },
                            )
                        })
                })
                .collect()
        };
        for (sender, event) in deliveries {
            let _ = sender.send(event);
        }
        true
    }
}

impl HostDocument for MemoryDocument {
    fn ready_state(&self) -> ReadyState {
        self.inner.lock().ready_state()
    }

    fn on_parsed(&self, notify: oneshot::Sender<()>) {
        let mut inner = self.inner.lock();
        if inner.ready_state() == ReadyState::Loading {
            inner.parse_waiters.push(notify);
        } else {
            let _ = notify.send(());
        }
    }

    fn current_script(&self) -> Option<ScriptElement> {
        self.inner.lock().current_script.clone()
    }

    fn scripts(&self) -> Result<Vec<ScriptElement>, HostError> {
        let inner = self.inner.lock();
        match &inner.scan_failure {
            Some(message) => Err(HostError::ScriptsUnavailable(message.clone())),
            None => Ok(inner.scripts.clone()),
        }
    }

    fn contains_element(&self, id: &str) -> bool {
        self.inner.lock().find_root(id).is_some()
    }

    fn append_to_body(&self, element: Element) -> Result<(), HostError> {
        let mut inner = self.inner.lock();
        if inner.body_detached {
            return Err(HostError::BodyUnavailable);
        }
        inner.body.push(element);
        Ok(())
    }

    fn add_click_listener(&self, id: &str, sender: InteractionSender) -> bool {
        let mut inner = self.inner.lock();
        if inner.find_root(id).is_none() {
            return false;
        }
        inner.listeners.entry(id.to_string()).or_default().push(sender);
        true
    }

    fn set_style(&self, id: &str, property: &str, value: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.find_root(id).is_none() {
            return false;
        }
        inner
            .styles
            .entry(id.to_string())
            .or_default()
            .insert(property.to_string(), value.to_string());
        true
    }

    fn remove_element(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let top_level = inner.body.iter().position(|el| el.id.as_deref() == Some(id));
        let removed = if let Some(pos) = top_level {
            Some(inner.body.remove(pos))
        } else {
            inner.body.iter_mut().find_map(|root| root.remove_descendant(id))
        };
        let Some(removed) = removed else {
            return false;
        };
        for gone in removed.ids() {
            // A duplicate id elsewhere keeps its listeners.
            if inner.find_root(&gone).is_none() {
                inner.listeners.remove(&gone);
                inner.styles.remove(&gone);
            }
        }
        true
    }

    fn global(&self, key: &str) -> Result<Option<Value>, HostError> {
        Ok(self.inner.lock().globals.get(key).cloned())
    }
}
