//! Embeddable retention popup widget.
//!
//! Resolves business and customer identity from host-page signals, derives a
//! greeting, and manages a single overlay from scheduling through removal,
//! reporting lifecycle events along the way. The host page is reached only
//! through the traits in [`host`].

pub mod content;
pub mod error;
pub mod host;
pub mod identity;
pub mod lifecycle;
pub mod logging;
pub mod markup;
pub mod reporter;
pub mod resolver;
pub mod settings;
pub mod types;
pub mod widget;

pub use error::{HostError, WidgetError};
pub use lifecycle::{LifecycleController, LifecycleTiming, RunOutcome};
pub use settings::WidgetSettings;
pub use types::{CloseReason, LifecycleState, PopupContent, WidgetConfig, SENTINEL};
pub use widget::{Widget, WidgetHandle};
