//! Serializable point-in-time copy of a ledger.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::first_duplicate_id;

use crate::alert::LowStockAlert;
use crate::error::{LedgerError, LedgerResult};
use crate::item::InventoryItem;
use crate::movement::StockMovement;

/// Items, movement history, and alerts as of `taken_at`.
///
/// Movements are in append order. Movements and alerts may reference items
/// that have since been removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub taken_at: DateTime<Utc>,
    pub items: Vec<InventoryItem>,
    pub movements: Vec<StockMovement>,
    pub alerts: Vec<LowStockAlert>,
}

impl LedgerSnapshot {
    /// Check everything a ledger relies on before it can be rebuilt from this.
    pub fn validate(&self) -> LedgerResult<()> {
        if let Some(id) = first_duplicate_id(&self.items) {
            return Err(LedgerError::CorruptSnapshot(format!("duplicate item id {id}")));
        }
        if let Some(id) = first_duplicate_id(&self.movements) {
            return Err(LedgerError::CorruptSnapshot(format!("duplicate movement id {id}")));
        }
        if let Some(id) = first_duplicate_id(&self.alerts) {
            return Err(LedgerError::CorruptSnapshot(format!("duplicate alert id {id}")));
        }

        let mut skus = HashSet::new();
        for item in &self.items {
            item.check_invariants().map_err(|e| {
                LedgerError::CorruptSnapshot(format!("item {}: {e}", item.id_typed()))
            })?;
            if !skus.insert((item.vendor_id(), item.sku())) {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "duplicate sku {:?} for vendor {}",
                    item.sku(),
                    item.vendor_id()
                )));
            }
        }

        let mut last_sequence = 0;
        for movement in &self.movements {
            if movement.sequence() <= last_sequence {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "movement sequence {} follows {}",
                    movement.sequence(),
                    last_sequence
                )));
            }
            last_sequence = movement.sequence();
        }

        let mut open = HashSet::new();
        for alert in &self.alerts {
            if !alert.acknowledged() && !open.insert((alert.inventory_item_id(), alert.severity())) {
                return Err(LedgerError::CorruptSnapshot(format!(
                    "more than one open {} alert for item {}",
                    alert.severity(),
                    alert.inventory_item_id()
                )));
            }
        }

        Ok(())
    }
}
