//! Configuration resolution from host-page signals.
//!
//! Resolution order, first step yielding at least one non-empty value wins:
//! 1. `data-business-id` / `data-email` on the currently executing script
//! 2. the most recently inserted script whose `src` names the widget file
//! 3. the host's global configuration object
//! 4. sentinels
//!
//! Failures in steps 2 and 3 are logged and skipped. Resolution itself cannot
//! fail.

use crate::host::{HostConfigSource, HostDocument, ScriptElement};
use crate::types::WidgetConfig;

pub const BUSINESS_ID_ATTR: &str = "data-business-id";
pub const EMAIL_ATTR: &str = "data-email";

/// Which signal produced the resolved config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CurrentScript,
    ScriptScan,
    HostGlobal,
    Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub config: WidgetConfig,
    pub source: ConfigSource,
}

/// Resolve the widget identity. Always returns a complete config.
pub fn resolve_config(
    document: &dyn HostDocument,
    host_config: Option<&dyn HostConfigSource>,
    script_filename: &str,
) -> Resolution {
    let resolution = resolve_steps(document, host_config, script_filename);
    log::info!(
        "Resolved widget config from {:?}: business_id={} customer_email={}",
        resolution.source,
        resolution.config.business_id,
        resolution.config.customer_email
    );
    resolution
}

fn resolve_steps(
    document: &dyn HostDocument,
    host_config: Option<&dyn HostConfigSource>,
    script_filename: &str,
) -> Resolution {
    if let Some(config) = document.current_script().as_ref().and_then(config_from_script) {
        return Resolution {
            config,
            source: ConfigSource::CurrentScript,
        };
    }

    match document.scripts() {
        Ok(scripts) => {
            let found = scripts
                .iter()
                .rev()
                .filter(|script| {
                    script
                        .src
                        .as_deref()
                        .is_some_and(|src| src.contains(script_filename))
                })
                .find_map(config_from_script);
            if let Some(config) = found {
                return Resolution {
                    config,
                    source: ConfigSource::ScriptScan,
                };
            }
        }
        Err(e) => log::warn!("Fallback script scan failed: {}", e),
    }

    if let Some(source) = host_config {
        match source.read() {
            Ok(Some(global)) => {
                if let Some(config) =
                    WidgetConfig::from_signals(global.business_id.as_deref(), global.email.as_deref())
                {
                    return Resolution {
                        config,
                        source: ConfigSource::HostGlobal,
                    };
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Host global config unreadable: {}", e),
        }
    }

    Resolution {
        config: WidgetConfig::unknown(),
        source: ConfigSource::Defaults,
    }
}

fn config_from_script(script: &ScriptElement) -> Option<WidgetConfig> {
    WidgetConfig::from_signals(script.attribute(BUSINESS_ID_ATTR), script.attribute(EMAIL_ATTR))
}
