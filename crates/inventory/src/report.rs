//! Reporting over current item state.
//!
//! Everything here is recomputed from the items passed in; nothing is cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{InventoryItemId, VendorId};

use crate::item::InventoryItem;

/// Aggregate figures for a vendor's (or the whole ledger's) inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total_items: usize,
    /// Σ current stock × unit cost, in minor currency units.
    pub total_value: i64,
    /// Items with `0 < current <= reorder_point`.
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub average_stock: f64,
    /// Stock value per category.
    pub category_breakdown: BTreeMap<String, i64>,
}

impl InventoryStats {
    pub fn compute<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        let mut stats = Self::default();
        let mut total_stock: i64 = 0;

        for item in items {
            stats.total_items += 1;
            total_stock = total_stock.saturating_add(item.current_stock());

            let value = item.stock_value();
            stats.total_value = stats.total_value.saturating_add(value);
            let category = stats
                .category_breakdown
                .entry(item.category().to_string())
                .or_insert(0);
            *category = category.saturating_add(value);

            if item.current_stock() == 0 {
                stats.out_of_stock_items += 1;
            } else if item.needs_reorder() {
                stats.low_stock_items += 1;
            }
        }

        if stats.total_items > 0 {
            stats.average_stock = total_stock as f64 / stats.total_items as f64;
        }
        stats
    }
}

/// One line of the restocking list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry {
    pub item_id: InventoryItemId,
    pub sku: String,
    pub product_name: String,
    pub vendor_id: VendorId,
    pub current_stock: i64,
    pub reorder_point: i64,
    pub suggested_quantity: i64,
}

impl From<&InventoryItem> for ReorderEntry {
    fn from(item: &InventoryItem) -> Self {
        let thresholds = item.thresholds();
        Self {
            item_id: item.id_typed(),
            sku: item.sku().to_string(),
            product_name: item.product_name().to_string(),
            vendor_id: item.vendor_id(),
            current_stock: item.current_stock(),
            reorder_point: thresholds.reorder_point,
            suggested_quantity: thresholds.reorder_quantity,
        }
    }
}

/// Items at or below their reorder point, emptiest first.
pub fn reorder_list<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Vec<ReorderEntry> {
    let mut entries: Vec<ReorderEntry> = items
        .into_iter()
        .filter(|item| item.needs_reorder())
        .map(ReorderEntry::from)
        .collect();
    entries.sort_by(|a, b| a.current_stock.cmp(&b.current_stock).then_with(|| a.sku.cmp(&b.sku)));
    entries
}

/// Items whose expiry date is on or before `now + within`, soonest first.
/// Already-expired items are included. A window past the representable
/// range saturates instead of overflowing.
pub fn expiring_items<'a>(
    items: impl IntoIterator<Item = &'a InventoryItem>,
    within: Duration,
    now: DateTime<Utc>,
) -> Vec<InventoryItem> {
    let horizon = now.checked_add_signed(within).unwrap_or(if within < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    });
    let mut expiring: Vec<InventoryItem> = items
        .into_iter()
        .filter(|item| item.expiry_date().is_some_and(|d| d <= horizon))
        .cloned()
        .collect();
    expiring.sort_by_key(|item| item.expiry_date());
    expiring
}
