//! Inventory ledger with low-stock alerting.
//!
//! [`InventoryLedger`] owns per-item stock counters, an append-only movement
//! history, and low-stock alerts. Hosts share one ledger behind an `Arc`,
//! observe it through the event bus or alert subscribers, and persist it via
//! [`LedgerSnapshot`]. No IO, no HTTP, no storage.

pub mod alert;
pub mod config;
pub mod error;
pub mod events;
pub mod item;
pub mod ledger;
pub mod movement;
pub mod notify;
pub mod report;
pub mod snapshot;
pub mod subscriber;

pub use alert::{AlertFilter, AlertSeverity, LowStockAlert};
pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use events::{AlertAcknowledged, ItemAdded, ItemRemoved, ItemUpdated, LedgerEvent};
pub use item::{
    InventoryItem, ItemStatus, ItemUpdate, NewInventoryItem, Pricing, StockChange, StockThresholds,
};
pub use ledger::{BulkStockUpdate, BulkUpdateResult, FulfilledOrder, InventoryLedger};
pub use movement::{Actor, MovementFilter, MovementType, StockMovement};
pub use notify::{NotificationSink, NotifyingSubscriber, StockNotification, TracingSink};
pub use report::{InventoryStats, ReorderEntry};
pub use snapshot::LedgerSnapshot;
pub use subscriber::{AlertSubscriber, DeliveryReport, SubscriberId};

pub use stockledger_core::{AlertId, InventoryItemId, ProductId, UserId, VendorId};
