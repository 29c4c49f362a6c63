//! Tracing/logging initialization.
//!
//! JSON lines to stdout. `RUST_LOG` wins over the fallback directive, e.g.
//! `RUST_LOG=stockledger_inventory=debug` to see every recorded movement.

use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set and valid, else `fallback`.
pub fn filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global JSON subscriber.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(fallback: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(fallback))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}
