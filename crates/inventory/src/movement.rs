//! Stock movements: the append-only audit trail of every quantity change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Entity, InventoryItemId, MovementId, UserId};

use crate::item::StockChange;

/// Kind of quantity change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Stock received (delta).
    In,
    /// Stock shipped or written off (delta, clamped at zero).
    Out,
    /// Stock counted and set (absolute).
    Adjustment,
    /// Stock held against an open order.
    Reserved,
    /// Hold removed.
    Released,
}

impl MovementType {
    /// Whether the movement changes on-hand stock (as opposed to the
    /// reservation counter).
    pub fn touches_on_hand(self) -> bool {
        matches!(self, Self::In | Self::Out | Self::Adjustment)
    }
}

/// Who performed a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub user_name: String,
}

impl Actor {
    pub fn new(user_id: UserId, user_name: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
        }
    }
}

/// Immutable record of one mutation.
///
/// `previous_stock`/`new_stock` hold on-hand values for In/Out/Adjustment and
/// the reserved counter for Reserved/Released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    id: MovementId,
    sequence: u64,
    inventory_item_id: InventoryItemId,
    movement_type: MovementType,
    quantity: i64,
    previous_stock: i64,
    new_stock: i64,
    reason: String,
    reference: Option<String>,
    user_id: UserId,
    user_name: String,
    timestamp: DateTime<Utc>,
    notes: Option<String>,
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl StockMovement {
    pub fn id_typed(&self) -> MovementId {
        self.id
    }

    /// Ledger-wide position; strictly increasing in append order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn inventory_item_id(&self) -> InventoryItemId {
        self.inventory_item_id
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn previous_stock(&self) -> i64 {
        self.previous_stock
    }

    pub fn new_stock(&self) -> i64 {
        self.new_stock
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// What the caller asked for; becomes a [`StockMovement`] once applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MovementRequest {
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub reference: Option<String>,
}

impl MovementRequest {
    pub fn new(movement_type: MovementType, quantity: i64, reason: impl Into<String>) -> Self {
        Self {
            movement_type,
            quantity,
            reason: reason.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn into_movement(
        self,
        sequence: u64,
        item_id: InventoryItemId,
        change: &StockChange,
        actor: &Actor,
        timestamp: DateTime<Utc>,
    ) -> StockMovement {
        let notes = change.trimmed_reservation.map(|before| {
            format!("reservation trimmed from {before} to {} to match on-hand stock", change.new)
        });

        StockMovement {
            id: MovementId::new(),
            sequence,
            inventory_item_id: item_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            previous_stock: change.previous,
            new_stock: change.new,
            reason: self.reason,
            reference: self.reference,
            user_id: actor.user_id,
            user_name: actor.user_name.clone(),
            timestamp,
            notes,
        }
    }
}

/// Query over the movement history. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub item_id: Option<InventoryItemId>,
    pub movement_type: Option<MovementType>,
    /// Falls back to the ledger's configured history limit.
    pub limit: Option<usize>,
}

impl MovementFilter {
    pub fn for_item(item_id: InventoryItemId) -> Self {
        Self {
            item_id: Some(item_id),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, movement: &StockMovement) -> bool {
        self.item_id.is_none_or(|id| movement.inventory_item_id == id)
            && self
                .movement_type
                .is_none_or(|ty| movement.movement_type == ty)
    }
}
