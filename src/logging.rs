//! Tracing subscriber installation for the `atelier` binary.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "ATELIER_LOG";

/// Build the filter: `ATELIER_LOG` if set and valid, otherwise `level`.
pub fn filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("Invalid log level '{}': {}", level, e)),
    }
}

/// Install the global subscriber. Logs go to stderr.
pub fn init(level: &str, json: bool) -> Result<()> {
    let filter = filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_known_levels() {
        for level in ["trace", "debug", "info", "warn", "error", "atelier=debug"] {
            assert!(filter(level).is_ok(), "{level}");
        }
    }

    #[test]
    fn test_filter_rejects_garbage_without_env() {
        if std::env::var(LOG_ENV).is_err() {
            assert!(filter("atelier=notalevel").is_err());
        }
    }
}
