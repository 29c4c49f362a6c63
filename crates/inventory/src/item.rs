use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    DomainError, DomainResult, Entity, InventoryItemId, ProductId, ValueObject, VendorId,
};

use crate::error::{LedgerError, LedgerResult};
use crate::movement::MovementType;

/// Lifecycle status of an inventory item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    Inactive,
    Discontinued,
}

/// Vendor-configured restocking thresholds.
///
/// No ordering is enforced between the three levels; a minimum stock level
/// above the reorder point is unusual but valid.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockThresholds {
    pub reorder_point: i64,
    pub reorder_quantity: i64,
    pub min_stock_level: i64,
}

impl ValueObject for StockThresholds {
    fn validate(&self) -> DomainResult<()> {
        if self.reorder_point < 0 || self.reorder_quantity < 0 || self.min_stock_level < 0 {
            return Err(DomainError::validation("thresholds", "cannot be negative"));
        }
        Ok(())
    }
}

/// Unit pricing in minor currency units. Used for valuation only.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub unit_cost: i64,
    pub unit_price: i64,
}

impl ValueObject for Pricing {
    fn validate(&self) -> DomainResult<()> {
        if self.unit_cost < 0 || self.unit_price < 0 {
            return Err(DomainError::validation("pricing", "cannot be negative"));
        }
        Ok(())
    }
}

/// One stocked (product, vendor) pair.
///
/// Quantities only change through [`InventoryItem::apply_change`], which keeps
/// `0 <= reserved_stock <= current_stock`. Available stock is always derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: InventoryItemId,
    product_id: ProductId,
    product_name: String,
    sku: String,
    category: String,
    vendor_id: VendorId,
    vendor_name: String,
    current_stock: i64,
    reserved_stock: i64,
    thresholds: StockThresholds,
    pricing: Pricing,
    status: ItemStatus,
    location: Option<String>,
    supplier: Option<String>,
    expiry_date: Option<DateTime<Utc>>,
    batch_number: Option<String>,
    last_updated: DateTime<Utc>,
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl InventoryItem {
    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    pub fn vendor_name(&self) -> &str {
        &self.vendor_name
    }

    pub fn current_stock(&self) -> i64 {
        self.current_stock
    }

    pub fn reserved_stock(&self) -> i64 {
        self.reserved_stock
    }

    /// On-hand stock not held against open orders.
    pub fn available_stock(&self) -> i64 {
        self.current_stock - self.reserved_stock
    }

    pub fn thresholds(&self) -> StockThresholds {
        self.thresholds
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
    }

    pub fn batch_number(&self) -> Option<&str> {
        self.batch_number.as_deref()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Valuation at cost: on-hand units times unit cost.
    pub fn stock_value(&self) -> i64 {
        self.current_stock.saturating_mul(self.pricing.unit_cost)
    }

    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.thresholds.reorder_point
    }

    /// Check the quantity invariants.
    pub fn check_invariants(&self) -> DomainResult<()> {
        if self.current_stock < 0 {
            return Err(DomainError::invariant("current stock is negative"));
        }
        if self.reserved_stock < 0 {
            return Err(DomainError::invariant("reserved stock is negative"));
        }
        if self.reserved_stock > self.current_stock {
            return Err(DomainError::invariant("reserved stock exceeds current stock"));
        }
        Ok(())
    }

    /// Apply one movement to the quantities.
    ///
    /// `In`/`Out`/`Adjustment` move on-hand stock; `Reserved`/`Released` move
    /// the reservation counter, and the returned change reports that counter.
    /// Out and Adjustment clamp at zero; if on-hand drops below the reserved
    /// count, the reservation is trimmed down to what is left.
    pub fn apply_change(
        &mut self,
        movement_type: MovementType,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> LedgerResult<StockChange> {
        if quantity < 0 {
            return Err(LedgerError::NegativeQuantity(quantity));
        }

        let change = match movement_type {
            MovementType::In => {
                let new = self
                    .current_stock
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::validation("quantity", "stock would overflow"))?;
                self.set_on_hand(new)
            }
            MovementType::Out => self.set_on_hand((self.current_stock - quantity).max(0)),
            MovementType::Adjustment => self.set_on_hand(quantity),
            MovementType::Reserved => {
                let available = self.available_stock();
                if quantity > available {
                    return Err(LedgerError::InsufficientAvailable {
                        requested: quantity,
                        available,
                    });
                }
                let previous = self.reserved_stock;
                self.reserved_stock += quantity;
                StockChange::plain(previous, self.reserved_stock)
            }
            MovementType::Released => {
                let previous = self.reserved_stock;
                self.reserved_stock = (previous - quantity).max(0);
                StockChange::plain(previous, self.reserved_stock)
            }
        };

        self.last_updated = at;
        debug_assert!(self.check_invariants().is_ok());
        Ok(change)
    }

    fn set_on_hand(&mut self, new: i64) -> StockChange {
        let previous = self.current_stock;
        self.current_stock = new;

        let trimmed_reservation = (self.reserved_stock > new).then(|| {
            let before = self.reserved_stock;
            self.reserved_stock = new;
            before
        });

        StockChange {
            previous,
            new,
            trimmed_reservation,
        }
    }

    pub(crate) fn apply_update(&mut self, update: ItemUpdate, at: DateTime<Utc>) -> DomainResult<()> {
        if let Some(thresholds) = &update.thresholds {
            thresholds.validate()?;
        }
        if let Some(pricing) = &update.pricing {
            pricing.validate()?;
        }
        if let Some(category) = &update.category {
            if category.trim().is_empty() {
                return Err(DomainError::validation("category", "cannot be empty"));
            }
        }

        if let Some(thresholds) = update.thresholds {
            self.thresholds = thresholds;
        }
        if let Some(pricing) = update.pricing {
            self.pricing = pricing;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if update.location.is_some() {
            self.location = update.location;
        }
        if update.supplier.is_some() {
            self.supplier = update.supplier;
        }
        if update.expiry_date.is_some() {
            self.expiry_date = update.expiry_date;
        }
        if update.batch_number.is_some() {
            self.batch_number = update.batch_number;
        }
        self.last_updated = at;
        Ok(())
    }
}

/// Before/after values of the counter a movement touched.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub previous: i64,
    pub new: i64,
    /// Reserved count before it was trimmed to fit the new on-hand stock.
    pub trimmed_reservation: Option<i64>,
}

impl StockChange {
    fn plain(previous: i64, new: i64) -> Self {
        Self {
            previous,
            new,
            trimmed_reservation: None,
        }
    }
}

/// Input for adding an item to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub category: String,
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub current_stock: i64,
    pub reserved_stock: i64,
    pub thresholds: StockThresholds,
    pub pricing: Pricing,
    pub status: ItemStatus,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub batch_number: Option<String>,
}

impl NewInventoryItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        sku: impl Into<String>,
        vendor_id: VendorId,
        vendor_name: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            sku: sku.into(),
            category: "uncategorized".to_string(),
            vendor_id,
            vendor_name: vendor_name.into(),
            current_stock: 0,
            reserved_stock: 0,
            thresholds: StockThresholds::default(),
            pricing: Pricing::default(),
            status: ItemStatus::Active,
            location: None,
            supplier: None,
            expiry_date: None,
            batch_number: None,
        }
    }

    pub fn with_stock(mut self, current_stock: i64, reserved_stock: i64) -> Self {
        self.current_stock = current_stock;
        self.reserved_stock = reserved_stock;
        self
    }

    pub fn with_thresholds(mut self, reorder_point: i64, reorder_quantity: i64, min_stock_level: i64) -> Self {
        self.thresholds = StockThresholds {
            reorder_point,
            reorder_quantity,
            min_stock_level,
        };
        self
    }

    pub fn with_pricing(mut self, unit_cost: i64, unit_price: i64) -> Self {
        self.pricing = Pricing {
            unit_cost,
            unit_price,
        };
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_expiry(mut self, expiry_date: DateTime<Utc>, batch_number: Option<String>) -> Self {
        self.expiry_date = Some(expiry_date);
        self.batch_number = batch_number;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    pub(crate) fn into_item(self, id: InventoryItemId, at: DateTime<Utc>) -> DomainResult<InventoryItem> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku", "cannot be empty"));
        }
        if self.product_name.trim().is_empty() {
            return Err(DomainError::validation("product_name", "cannot be empty"));
        }
        if self.category.trim().is_empty() {
            return Err(DomainError::validation("category", "cannot be empty"));
        }
        self.thresholds.validate()?;
        self.pricing.validate()?;

        let item = InventoryItem {
            id,
            product_id: self.product_id,
            product_name: self.product_name,
            sku: self.sku.trim().to_string(),
            category: self.category,
            vendor_id: self.vendor_id,
            vendor_name: self.vendor_name,
            current_stock: self.current_stock,
            reserved_stock: self.reserved_stock,
            thresholds: self.thresholds,
            pricing: self.pricing,
            status: self.status,
            location: self.location,
            supplier: self.supplier,
            expiry_date: self.expiry_date,
            batch_number: self.batch_number,
            last_updated: at,
        };
        item.check_invariants()
            .map_err(|e| DomainError::validation("stock", e.to_string()))?;
        Ok(item)
    }
}

/// Changes to an item's non-stock settings. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub thresholds: Option<StockThresholds>,
    pub pricing: Option<Pricing>,
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub batch_number: Option<String>,
}
