//! Low-stock alerts derived from item state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{AlertId, Entity, InventoryItemId, ProductId, UserId, VendorId};

use crate::item::InventoryItem;

/// How urgent a low-stock condition is. Ordered from least to most severe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Critical,
    OutOfStock,
}

impl AlertSeverity {
    /// Severity for an on-hand level, or `None` above the reorder point.
    ///
    /// Zero stock is always `OutOfStock`, whatever the reorder point.
    /// `Critical` applies strictly below `critical_percent`% of the reorder
    /// point; exactly half of a reorder point of 10 is still `Low`.
    pub fn evaluate(current_stock: i64, reorder_point: i64, critical_percent: u8) -> Option<Self> {
        if current_stock <= 0 {
            return Some(Self::OutOfStock);
        }

        // Integer form of `current < reorder_point * percent / 100`.
        let scaled_current = i128::from(current_stock) * 100;
        let scaled_threshold = i128::from(reorder_point) * i128::from(critical_percent);
        if scaled_current < scaled_threshold {
            Some(Self::Critical)
        } else if current_stock <= reorder_point {
            Some(Self::Low)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Critical => "CRITICAL",
            Self::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

impl core::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised low-stock condition for one item.
///
/// Alerts are snapshots: `current_stock` is the level when the alert was
/// raised. Acknowledging only changes the acknowledgement fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    id: AlertId,
    inventory_item_id: InventoryItemId,
    product_id: ProductId,
    product_name: String,
    current_stock: i64,
    min_stock_level: i64,
    reorder_point: i64,
    severity: AlertSeverity,
    vendor_id: VendorId,
    vendor_name: String,
    created_at: DateTime<Utc>,
    acknowledged: bool,
    acknowledged_by: Option<UserId>,
    acknowledged_at: Option<DateTime<Utc>>,
}

impl Entity for LowStockAlert {
    type Id = AlertId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl LowStockAlert {
    pub(crate) fn raise(item: &InventoryItem, severity: AlertSeverity, at: DateTime<Utc>) -> Self {
        let thresholds = item.thresholds();
        Self {
            id: AlertId::new(),
            inventory_item_id: item.id_typed(),
            product_id: item.product_id(),
            product_name: item.product_name().to_string(),
            current_stock: item.current_stock(),
            min_stock_level: thresholds.min_stock_level,
            reorder_point: thresholds.reorder_point,
            severity,
            vendor_id: item.vendor_id(),
            vendor_name: item.vendor_name().to_string(),
            created_at: at,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    pub(crate) fn acknowledge(&mut self, by: UserId, at: DateTime<Utc>) {
        self.acknowledged = true;
        self.acknowledged_by = Some(by);
        self.acknowledged_at = Some(at);
    }

    /// Whether this is an open alert of `severity` for `item_id`.
    pub(crate) fn is_open_for(&self, item_id: InventoryItemId, severity: AlertSeverity) -> bool {
        !self.acknowledged && self.inventory_item_id == item_id && self.severity == severity
    }

    pub fn id_typed(&self) -> AlertId {
        self.id
    }

    pub fn inventory_item_id(&self) -> InventoryItemId {
        self.inventory_item_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn current_stock(&self) -> i64 {
        self.current_stock
    }

    pub fn min_stock_level(&self) -> i64 {
        self.min_stock_level
    }

    pub fn reorder_point(&self) -> i64 {
        self.reorder_point
    }

    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    pub fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn vendor_name(&self) -> &str {
        &self.vendor_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn acknowledged_by(&self) -> Option<UserId> {
        self.acknowledged_by
    }

    pub fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.acknowledged_at
    }
}

/// Query over alerts. The default lists open alerts only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub vendor_id: Option<VendorId>,
    pub item_id: Option<InventoryItemId>,
    pub severity: Option<AlertSeverity>,
    pub include_acknowledged: bool,
}

impl AlertFilter {
    pub fn for_vendor(vendor_id: VendorId) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            ..Self::default()
        }
    }

    pub fn for_item(item_id: InventoryItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn including_acknowledged(mut self) -> Self {
        self.include_acknowledged = true;
        self
    }

    pub(crate) fn matches(&self, alert: &LowStockAlert) -> bool {
        (self.include_acknowledged || !alert.acknowledged)
            && self.vendor_id.is_none_or(|v| alert.vendor_id == v)
            && self.item_id.is_none_or(|i| alert.inventory_item_id == i)
            && self.severity.is_none_or(|s| alert.severity == s)
    }
}
