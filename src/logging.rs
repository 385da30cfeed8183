//! Opt-in log output for applications that do not install a subscriber.
//!
//! The crate only emits `tracing` events. [`init`] is called by
//! [`DeveloperApiClient::new`](crate::DeveloperApiClient::new) when
//! [`ClientConfig::with_log_level`](crate::ClientConfig::with_log_level) is
//! set. Tokens and secrets are never part of any event.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber that shows this crate's events at `level`.
///
/// `RUST_LOG` takes precedence when set. Does nothing if a global
/// subscriber is already installed.
pub fn init(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::new(directive(level))
}

fn directive(level: Level) -> String {
    format!(
        "{}={}",
        env!("CARGO_CRATE_NAME"),
        level.as_str().to_ascii_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_targets_crate() {
        assert_eq!(directive(Level::DEBUG), "enverus_rs=debug");
        assert_eq!(directive(Level::WARN), "enverus_rs=warn");
    }

    #[test]
    fn test_init_is_idempotent() {
        init(Level::INFO);
        init(Level::DEBUG);
    }
}
