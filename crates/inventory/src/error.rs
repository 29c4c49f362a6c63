//! Ledger error model.

use thiserror::Error;

use stockledger_core::{AlertId, DomainError, InventoryItemId, VendorId};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Why a ledger operation did not happen.
///
/// Every failure leaves the ledger untouched: no movement, no alert, no event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("inventory item {0} not found")]
    ItemNotFound(InventoryItemId),

    #[error("insufficient available stock (requested {requested}, available {available})")]
    InsufficientAvailable { requested: i64, available: i64 },

    #[error("insufficient reserved stock (requested {requested}, reserved {reserved})")]
    InsufficientReserved { requested: i64, reserved: i64 },

    #[error("quantity must not be negative (got {0})")]
    NegativeQuantity(i64),

    #[error("sku {sku:?} already exists for vendor {vendor_id}")]
    DuplicateSku { vendor_id: VendorId, sku: String },

    #[error("item {item_id} still has {reserved} units reserved")]
    ItemHasReservations { item_id: InventoryItemId, reserved: i64 },

    #[error("alert {0} not found")]
    AlertNotFound(AlertId),

    #[error("alert {0} was already acknowledged")]
    AlertAlreadyAcknowledged(AlertId),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("ledger lock poisoned")]
    Poisoned,
}

impl LedgerError {
    /// True for lookup failures, the case callers used to get as a bare `false`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound(_) | Self::AlertNotFound(_))
    }

    /// True when the request was refused for lack of stock.
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(
            self,
            Self::InsufficientAvailable { .. } | Self::InsufficientReserved { .. }
        )
    }
}
