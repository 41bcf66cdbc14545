//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Pick JSON or human readable output
//! - Configure log level from config, `--debug`, or `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(config: &ObservabilityConfig, debug: bool) -> String {
    let level = if debug { "debug" } else { config.log_level.as_str() };
    format!("lb_operator={level},tower_http=info")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(config: &ObservabilityConfig, debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(config, debug).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.pretty {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_overrides_level() {
        let config = ObservabilityConfig::default();
        assert_eq!(default_directive(&config, false), "lb_operator=info,tower_http=info");
        assert_eq!(default_directive(&config, true), "lb_operator=debug,tower_http=info");
    }
}
