//! Process-wide logging setup for ledger hosts.

pub mod tracing;

/// Fallback directive when `RUST_LOG` is unset: ledger crates at `info`
/// (item changes, alerts, delivery failures), dependencies at `warn`.
pub const DEFAULT_FILTER: &str = "warn,stockledger_inventory=info,stockledger_events=info";

/// Install the JSON subscriber with [`DEFAULT_FILTER`]. Idempotent.
pub fn init() {
    tracing::init(DEFAULT_FILTER);
}
