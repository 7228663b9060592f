//! Logger initialization for binaries embedding the widget.
//!
//! The library only uses the `log` facade; whoever owns the process decides
//! where records go.

use env_logger::Env;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "pulse_widget=info";

/// Install `env_logger`. Safe to call more than once.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER))
        .format_timestamp_millis()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        log::info!("logger installed");
    }
}
