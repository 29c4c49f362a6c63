use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{AlertId, InventoryItemId, UserId, VendorId};
use stockledger_events::Event;

use crate::alert::LowStockAlert;
use crate::movement::StockMovement;

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub item_id: InventoryItemId,
    pub vendor_id: VendorId,
    pub sku: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemUpdated (settings only; stock changes are `StockMoved`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdated {
    pub item_id: InventoryItemId,
    pub vendor_id: VendorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub item_id: InventoryItemId,
    pub vendor_id: VendorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AlertAcknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertAcknowledged {
    pub alert_id: AlertId,
    pub item_id: InventoryItemId,
    pub acknowledged_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Everything the ledger publishes on its bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    ItemAdded(ItemAdded),
    ItemUpdated(ItemUpdated),
    ItemRemoved(ItemRemoved),
    StockMoved(StockMovement),
    AlertRaised(LowStockAlert),
    AlertAcknowledged(AlertAcknowledged),
}

impl LedgerEvent {
    /// The item the event concerns.
    pub fn item_id(&self) -> InventoryItemId {
        match self {
            LedgerEvent::ItemAdded(e) => e.item_id,
            LedgerEvent::ItemUpdated(e) => e.item_id,
            LedgerEvent::ItemRemoved(e) => e.item_id,
            LedgerEvent::StockMoved(m) => m.inventory_item_id(),
            LedgerEvent::AlertRaised(a) => a.inventory_item_id(),
            LedgerEvent::AlertAcknowledged(e) => e.item_id,
        }
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::ItemAdded(_) => "inventory.item.added",
            LedgerEvent::ItemUpdated(_) => "inventory.item.updated",
            LedgerEvent::ItemRemoved(_) => "inventory.item.removed",
            LedgerEvent::StockMoved(_) => "inventory.stock.moved",
            LedgerEvent::AlertRaised(_) => "inventory.alert.raised",
            LedgerEvent::AlertAcknowledged(_) => "inventory.alert.acknowledged",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::ItemAdded(e) => e.occurred_at,
            LedgerEvent::ItemUpdated(e) => e.occurred_at,
            LedgerEvent::ItemRemoved(e) => e.occurred_at,
            LedgerEvent::StockMoved(m) => m.timestamp(),
            LedgerEvent::AlertRaised(a) => a.created_at(),
            LedgerEvent::AlertAcknowledged(e) => e.occurred_at,
        }
    }
}
