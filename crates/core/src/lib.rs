//! `stockledger-core`: shared building blocks for the stock ledger.
//!
//! Identifiers, the domain error model, and the marker traits used by the
//! inventory types. No IO, no locking, no storage.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::{Entity, first_duplicate_id};
pub use error::{DomainError, DomainResult};
pub use id::{AlertId, InventoryItemId, MovementId, ProductId, UserId, VendorId};
pub use value_object::ValueObject;
