//! Logging initialisation
//!
//! Logs go to stderr so that command output on stdout stays machine readable.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive for the subscriber.
///
/// Priority: explicit override (command line) → `RUST_LOG` → TOML `logging.level`.
pub fn filter_directive(config: &LoggingConfig, override_level: Option<&str>) -> String {
    if let Some(level) = override_level {
        return level.to_string();
    }
    if let Ok(env) = std::env::var("RUST_LOG") {
        if !env.trim().is_empty() {
            return env;
        }
    }
    config.level.clone()
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LoggingConfig, override_level: Option<&str>) -> Result<()> {
    let directive = filter_directive(config, override_level);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directive, e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Config(format!("Logging already initialised: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let config = LoggingConfig {
            level: "warn".to_string(),
        };
        assert_eq!(filter_directive(&config, Some("debug")), "debug");
    }
}
