//! Tracing subscriber setup for binaries and demos embedding the coordinator.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "writeguard=info";

/// Builds the filter: `RUST_LOG` wins, then `verbose`, then the default.
#[must_use]
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("writeguard=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}

/// Installs a global tracing subscriber.
///
/// With `json` set, events are written as JSON lines. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(verbose: bool, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter(verbose));
    let result = if json {
        registry.with(fmt::layer().json().with_target(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false, false);
        init_tracing(true, true);
    }

    #[test]
    fn test_env_filter_builds() {
        let filter = env_filter(true);
        assert!(!filter.to_string().is_empty());
    }
}
