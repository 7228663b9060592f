//! Host page abstraction.
//!
//! The widget never touches ambient page state directly. Everything it needs
//! from the embedding page goes through [`HostDocument`] (the document tree,
//! script elements, parse state) and [`HostConfigSource`] (the optional global
//! configuration object the page may set before loading the widget).

pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::HostError;
use crate::markup::Element;

pub use memory::MemoryDocument;

/// Document parsing progress, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// A `<script>` element in the host document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptElement {
    pub src: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl ScriptElement {
    pub fn new(src: Option<&str>) -> Self {
        Self {
            src: src.map(str::to_string),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A click delivered to a listener.
///
/// `target` is the element actually clicked; `current_target` is the element
/// the listener was registered on (clicks bubble up through ancestors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub target: String,
    pub current_target: String,
}

pub type InteractionSender = mpsc::UnboundedSender<ClickEvent>;

/// The live document of the embedding page.
pub trait HostDocument: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    /// Register a one-shot notification for parse completion. Fires
    /// immediately if parsing has already finished.
    fn on_parsed(&self, notify: oneshot::Sender<()>);

    /// The script element currently executing, when the host can tell.
    fn current_script(&self) -> Option<ScriptElement>;

    /// All script elements in document order.
    fn scripts(&self) -> Result<Vec<ScriptElement>, HostError>;

    fn contains_element(&self, id: &str) -> bool;

    fn append_to_body(&self, element: Element) -> Result<(), HostError>;

    /// Attach a click listener. Returns false when no element has `id`.
    fn add_click_listener(&self, id: &str, sender: InteractionSender) -> bool;

    /// Returns false when no element has `id`.
    fn set_style(&self, id: &str, property: &str, value: &str) -> bool;

    /// Detach the element and its listeners. Returns false when absent.
    fn remove_element(&self, id: &str) -> bool;

    /// A page-global value published under `key`, if any.
    fn global(&self, key: &str) -> Result<Option<Value>, HostError>;
}

// ---------------------------------------------------------------------------
// Global host configuration
// ---------------------------------------------------------------------------

/// The `{ businessId?, email? }` object a host page may publish globally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostGlobalConfig {
    pub business_id: Option<String>,
    pub email: Option<String>,
}

impl HostGlobalConfig {
    /// Read the object shape leniently: strings and numbers are accepted,
    /// anything else counts as absent.
    pub fn from_value(value: &Value) -> Result<Option<Self>, HostError> {
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(Self {
                business_id: map.get("businessId").and_then(scalar_to_string),
                email: map.get("email").and_then(scalar_to_string),
            })),
            other => Err(HostError::MalformedConfig(format!(
                "expected an object, got {}",
                json_kind(other)
            ))),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read-only source for the global host configuration.
pub trait HostConfigSource: Send + Sync {
    fn read(&self) -> Result<Option<HostGlobalConfig>, HostError>;
}

impl HostConfigSource for HostGlobalConfig {
    fn read(&self) -> Result<Option<HostGlobalConfig>, HostError> {
        Ok(Some(self.clone()))
    }
}

/// Global configuration as raw JSON serialized by the host page.
#[derive(Debug, Clone)]
pub struct JsonHostConfig {
    raw: String,
}

impl JsonHostConfig {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl HostConfigSource for JsonHostConfig {
    fn read(&self) -> Result<Option<HostGlobalConfig>, HostError> {
        if self.raw.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&self.raw)
            .map_err(|e| HostError::MalformedConfig(e.to_string()))?;
        HostGlobalConfig::from_value(&value)
    }
}

/// Global configuration published on the document under a named key.
pub struct DocumentGlobalConfig {
    document: Arc<dyn HostDocument>,
    key: String,
}

impl DocumentGlobalConfig {
    pub fn new(document: Arc<dyn HostDocument>, key: impl Into<String>) -> Self {
        Self {
            document,
            key: key.into(),
        }
    }
}

impl HostConfigSource for DocumentGlobalConfig {
    fn read(&self) -> Result<Option<HostGlobalConfig>, HostError> {
        match self.document.global(&self.key)? {
            Some(value) => HostGlobalConfig::from_value(&value),
            None => Ok(None),
        }
    }
}
