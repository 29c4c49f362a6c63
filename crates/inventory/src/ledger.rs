//! The inventory ledger: authoritative stock per item.
//!
//! Every quantity change goes through one code path that, under the item's
//! lock, applies the change, appends the movement, re-evaluates alerts, and
//! publishes the resulting bus events. Bus order per item therefore matches
//! movement `sequence` order. Alert subscriber callbacks run after the lock
//! is released.
//!
//! Lock order: catalog -> item -> movement log -> alerts -> bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Duration, Utc};

use stockledger_core::{AlertId, InventoryItemId, VendorId};
use stockledger_events::{EventBus, InMemoryEventBus, Subscription};

use crate::alert::{AlertFilter, AlertSeverity, LowStockAlert};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{AlertAcknowledged, ItemAdded, ItemRemoved, ItemUpdated, LedgerEvent};
use crate::item::{InventoryItem, ItemUpdate, NewInventoryItem};
use crate::movement::{Actor, MovementFilter, MovementRequest, MovementType, StockMovement};
use crate::report::{self, InventoryStats, ReorderEntry};
use crate::snapshot::LedgerSnapshot;
use crate::subscriber::{AlertSubscriber, SubscriberId, SubscriberRegistry};

#[derive(Debug)]
struct ItemSlot {
    item: InventoryItem,
    /// Set under the slot lock by `remove_item`; handles cloned before the
    /// removal must not mutate the item afterwards.
    removed: bool,
}

type SharedSlot = Arc<Mutex<ItemSlot>>;

#[derive(Debug, Default)]
struct Catalog {
    items: HashMap<InventoryItemId, SharedSlot>,
    skus: HashMap<(VendorId, String), InventoryItemId>,
}

/// Side effects collected under the item lock. Events are published before
/// the lock is released; raised alerts go to subscribers after it.
#[derive(Debug, Default)]
struct Effects {
    events: Vec<LedgerEvent>,
    raised: Vec<LowStockAlert>,
}

/// One stock update entry for [`InventoryLedger::bulk_update_stock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkStockUpdate {
    pub item_id: InventoryItemId,
    pub quantity: i64,
    pub movement_type: MovementType,
    pub reason: String,
}

/// Per-entry outcome counts of a bulk update. There is no rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkUpdateResult {
    pub success: usize,
    pub failed: usize,
    pub failures: Vec<(InventoryItemId, LedgerError)>,
}

/// The two movements recorded for one fulfilled order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfilledOrder {
    pub released: StockMovement,
    pub shipped: StockMovement,
}

/// In-memory stock ledger.
///
/// Construct once and share (`Arc<InventoryLedger>`); all methods take `&self`.
#[derive(Debug)]
pub struct InventoryLedger {
    config: LedgerConfig,
    catalog: RwLock<Catalog>,
    movements: RwLock<Vec<StockMovement>>,
    alerts: Mutex<Vec<LowStockAlert>>,
    subscribers: SubscriberRegistry,
    bus: InMemoryEventBus<LedgerEvent>,
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

/// Mutation context for one item, alive while its lock is held.
struct StockTxn<'a> {
    ledger: &'a InventoryLedger,
    slot: &'a mut ItemSlot,
    actor: &'a Actor,
    effects: &'a mut Effects,
}

impl StockTxn<'_> {
    fn item(&self) -> &InventoryItem {
        &self.slot.item
    }

    fn record(&mut self, request: MovementRequest) -> LedgerResult<StockMovement> {
        let now = Utc::now();
        // Take the log first so a poisoned log leaves the item untouched.
        let mut log = self.ledger.movements.write().map_err(|_| LedgerError::Poisoned)?;

        let item = &mut self.slot.item;
        let change = item.apply_change(request.movement_type, request.quantity, now)?;
        let sequence = log.last().map_or(1, |m| m.sequence() + 1);
        let movement = request.into_movement(sequence, item.id_typed(), &change, self.actor, now);
        log.push(movement.clone());
        drop(log);

        if let Some(before) = change.trimmed_reservation {
            tracing::warn!(
                item_id = %item.id_typed(),
                reserved_before = before,
                reserved_after = item.reserved_stock(),
                "on-hand stock fell below reservations; reservation trimmed"
            );
        }
        tracing::debug!(
            item_id = %item.id_typed(),
            movement = ?movement.movement_type(),
            quantity = movement.quantity(),
            previous = movement.previous_stock(),
            new = movement.new_stock(),
            user = %movement.user_name(),
            "stock movement recorded"
        );

        self.effects.events.push(LedgerEvent::StockMoved(movement.clone()));
        self.ledger.evaluate_alerts(&self.slot.item, now, self.effects);
        Ok(movement)
    }
}

impl InventoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            catalog: RwLock::new(Catalog::default()),
            movements: RwLock::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            subscribers: SubscriberRegistry::new(),
            bus: InMemoryEventBus::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Channel subscription to every ledger event published from now on.
    ///
    /// Publishing is a non-blocking send, so a slow consumer never holds up
    /// the mutating caller.
    pub fn subscribe(&self) -> Subscription<LedgerEvent> {
        self.bus.subscribe()
    }

    /// Register a callback for newly raised alerts.
    ///
    /// Callbacks run on the mutating caller's thread after the item lock is
    /// released, so a slow callback delays that caller's return (never other
    /// items' mutations). Consumers doing IO or other slow work should use
    /// [`subscribe`](Self::subscribe) and filter for
    /// [`LedgerEvent::AlertRaised`] on their own thread instead.
    pub fn register_subscriber(&self, subscriber: Arc<dyn AlertSubscriber>) -> SubscriberId {
        self.subscribers.register(subscriber)
    }

    pub fn unregister_subscriber(&self, id: SubscriberId) -> bool {
        self.subscribers.unregister(id)
    }

    // ---------------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------------

    pub fn add_item(&self, new_item: NewInventoryItem) -> LedgerResult<InventoryItem> {
        let now = Utc::now();
        let item = new_item.into_item(InventoryItemId::new(), now)?;

        let slot: SharedSlot = Arc::new(Mutex::new(ItemSlot {
            item: item.clone(),
            removed: false,
        }));
        let mut effects = Effects::default();

        {
            let mut catalog = self.catalog.write().map_err(|_| LedgerError::Poisoned)?;
            let sku_key = (item.vendor_id(), item.sku().to_string());
            if catalog.skus.contains_key(&sku_key) {
                return Err(LedgerError::DuplicateSku {
                    vendor_id: item.vendor_id(),
                    sku: item.sku().to_string(),
                });
            }
            catalog.skus.insert(sku_key, item.id_typed());
            catalog.items.insert(item.id_typed(), Arc::clone(&slot));

            // Lock before the catalog is released so no mutation can run
            // ahead of the initial alert evaluation.
            let guard = slot.lock().map_err(|_| LedgerError::Poisoned)?;
            drop(catalog);

            tracing::info!(
                item_id = %item.id_typed(),
                vendor_id = %item.vendor_id(),
                sku = item.sku(),
                current_stock = item.current_stock(),
                "inventory item added"
            );
            effects.events.push(LedgerEvent::ItemAdded(ItemAdded {
                item_id: item.id_typed(),
                vendor_id: item.vendor_id(),
                sku: item.sku().to_string(),
                occurred_at: now,
            }));
            self.evaluate_alerts(&guard.item, now, &mut effects);
            self.publish(&mut effects);
        }

        self.notify_subscribers(effects);
        Ok(item)
    }

    /// Change non-stock settings. Threshold changes re-evaluate alerts.
    pub fn update_item(&self, item_id: InventoryItemId, update: ItemUpdate) -> LedgerResult<InventoryItem> {
        let slot = self.slot(item_id)?;
        let mut effects = Effects::default();

        let updated = {
            let mut guard = lock_slot(&slot, item_id)?;
            let now = Utc::now();
            guard.item.apply_update(update, now)?;
            effects.events.push(LedgerEvent::ItemUpdated(ItemUpdated {
                item_id,
                vendor_id: guard.item.vendor_id(),
                occurred_at: now,
            }));
            self.evaluate_alerts(&guard.item, now, &mut effects);
            self.publish(&mut effects);
            guard.item.clone()
        };

        self.notify_subscribers(effects);
        Ok(updated)
    }

    /// Remove an item. Refused while stock is reserved for open orders.
    ///
    /// Movements and alerts of the item stay in the history.
    pub fn remove_item(&self, item_id: InventoryItemId) -> LedgerResult<InventoryItem> {
        let removed = {
            let mut catalog = self.catalog.write().map_err(|_| LedgerError::Poisoned)?;
            let slot = catalog
                .items
                .get(&item_id)
                .cloned()
                .ok_or(LedgerError::ItemNotFound(item_id))?;

            let mut guard = lock_slot(&slot, item_id)?;
            let reserved = guard.item.reserved_stock();
            if reserved > 0 {
                return Err(LedgerError::ItemHasReservations { item_id, reserved });
            }
            guard.removed = true;
            let key = (guard.item.vendor_id(), guard.item.sku().to_string());
            catalog.skus.remove(&key);
            catalog.items.remove(&item_id);

            tracing::info!(item_id = %item_id, sku = guard.item.sku(), "inventory item removed");
            self.publish(&mut Effects {
                events: vec![LedgerEvent::ItemRemoved(ItemRemoved {
                    item_id,
                    vendor_id: guard.item.vendor_id(),
                    occurred_at: Utc::now(),
                })],
                raised: Vec::new(),
            });
            guard.item.clone()
        };

        Ok(removed)
    }

    pub fn item(&self, item_id: InventoryItemId) -> LedgerResult<InventoryItem> {
        let slot = self.slot(item_id)?;
        let guard = lock_slot(&slot, item_id)?;
        Ok(guard.item.clone())
    }

    pub fn find_by_sku(&self, vendor_id: VendorId, sku: &str) -> LedgerResult<Option<InventoryItem>> {
        let slot = {
            let catalog = self.catalog.read().map_err(|_| LedgerError::Poisoned)?;
            catalog
                .skus
                .get(&(vendor_id, sku.to_string()))
                .and_then(|id| catalog.items.get(id))
                .cloned()
        };
        match slot {
            Some(slot) => {
                let guard = slot.lock().map_err(|_| LedgerError::Poisoned)?;
                Ok((!guard.removed).then(|| guard.item.clone()))
            }
            None => Ok(None),
        }
    }

    /// All items, optionally for one vendor, ordered by vendor then sku.
    pub fn items(&self, vendor_id: Option<VendorId>) -> LedgerResult<Vec<InventoryItem>> {
        let slots: Vec<SharedSlot> = {
            let catalog = self.catalog.read().map_err(|_| LedgerError::Poisoned)?;
            catalog.items.values().cloned().collect()
        };

        let mut items = Vec::with_capacity(slots.len());
        for slot in slots {
            let guard = slot.lock().map_err(|_| LedgerError::Poisoned)?;
            if guard.removed || vendor_id.is_some_and(|v| guard.item.vendor_id() != v) {
                continue;
            }
            items.push(guard.item.clone());
        }
        items.sort_by(|a, b| {
            a.vendor_id()
                .cmp(&b.vendor_id())
                .then_with(|| a.sku().cmp(b.sku()))
        });
        Ok(items)
    }

    // ---------------------------------------------------------------------
    // Stock movements
    // ---------------------------------------------------------------------

    /// Apply one movement of any type. Returns the recorded movement.
    pub fn update_stock(
        &self,
        item_id: InventoryItemId,
        quantity: i64,
        movement_type: MovementType,
        reason: impl Into<String>,
        actor: &Actor,
    ) -> LedgerResult<StockMovement> {
        let request = MovementRequest::new(movement_type, quantity, reason);
        self.mutate(item_id, actor, |txn| txn.record(request))
    }

    /// Hold `quantity` against an order. Fails without side effects when
    /// less than `quantity` is available.
    pub fn reserve_stock(
        &self,
        item_id: InventoryItemId,
        quantity: i64,
        actor: &Actor,
        order_ref: &str,
    ) -> LedgerResult<StockMovement> {
        self.mutate(item_id, actor, |txn| {
            ensure_non_negative(quantity)?;
            let available = txn.item().available_stock();
            if quantity > available {
                return Err(LedgerError::InsufficientAvailable {
                    requested: quantity,
                    available,
                });
            }
            txn.record(
                MovementRequest::new(
                    MovementType::Reserved,
                    quantity,
                    format!("Reserved for order {order_ref}"),
                )
                .with_reference(order_ref),
            )
        })
    }

    /// Drop a hold. Fails without side effects when less than `quantity` is
    /// reserved.
    pub fn release_stock(
        &self,
        item_id: InventoryItemId,
        quantity: i64,
        actor: &Actor,
        order_ref: &str,
    ) -> LedgerResult<StockMovement> {
        self.mutate(item_id, actor, |txn| {
            ensure_reserved(txn.item(), quantity)?;
            txn.record(
                MovementRequest::new(
                    MovementType::Released,
                    quantity,
                    format!("Reservation released for order {order_ref}"),
                )
                .with_reference(order_ref),
            )
        })
    }

    /// Ship a reserved order line: a `Released` then an `Out` movement,
    /// both recorded under one item lock.
    pub fn fulfill_order(
        &self,
        item_id: InventoryItemId,
        quantity: i64,
        actor: &Actor,
        order_ref: &str,
    ) -> LedgerResult<FulfilledOrder> {
        self.mutate(item_id, actor, |txn| {
            ensure_reserved(txn.item(), quantity)?;
            let released = txn.record(
                MovementRequest::new(
                    MovementType::Released,
                    quantity,
                    format!("Order {order_ref} fulfilled"),
                )
                .with_reference(order_ref),
            )?;
            let shipped = txn.record(
                MovementRequest::new(MovementType::Out, quantity, format!("Shipped for order {order_ref}"))
                    .with_reference(order_ref),
            )?;
            Ok(FulfilledOrder { released, shipped })
        })
    }

    /// Apply each entry independently; failures are counted, not rolled back.
    pub fn bulk_update_stock(
        &self,
        updates: impl IntoIterator<Item = BulkStockUpdate>,
        actor: &Actor,
    ) -> BulkUpdateResult {
        let mut result = BulkUpdateResult::default();
        for update in updates {
            match self.update_stock(
                update.item_id,
                update.quantity,
                update.movement_type,
                update.reason,
                actor,
            ) {
                Ok(_) => result.success += 1,
                Err(err) => {
                    result.failed += 1;
                    result.failures.push((update.item_id, err));
                }
            }
        }
        if result.failed > 0 {
            tracing::warn!(
                success = result.success,
                failed = result.failed,
                "bulk stock update partially failed"
            );
        }
        result
    }

    /// Movement history, newest first.
    pub fn movements(&self, filter: &MovementFilter) -> LedgerResult<Vec<StockMovement>> {
        let limit = filter.limit.unwrap_or(self.config.default_history_limit);
        let log = self.movements.read().map_err(|_| LedgerError::Poisoned)?;
        Ok(log
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .take(limit)
            .cloned()
            .collect())
    }

    // ---------------------------------------------------------------------
    // Alerts
    // ---------------------------------------------------------------------

    /// Alerts matching `filter`, newest first.
    pub fn alerts(&self, filter: &AlertFilter) -> LedgerResult<Vec<LowStockAlert>> {
        let alerts = self.alerts.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(alerts.iter().rev().filter(|a| filter.matches(a)).cloned().collect())
    }

    /// Every alert ever raised, in creation order.
    pub fn alert_history(&self) -> LedgerResult<Vec<LowStockAlert>> {
        let alerts = self.alerts.lock().map_err(|_| LedgerError::Poisoned)?;
        Ok(alerts.clone())
    }

    pub fn acknowledge_alert(&self, alert_id: AlertId, actor: &Actor) -> LedgerResult<LowStockAlert> {
        let now = Utc::now();
        let acknowledged = {
            let mut alerts = self.alerts.lock().map_err(|_| LedgerError::Poisoned)?;
            let alert = alerts
                .iter_mut()
                .find(|a| a.id_typed() == alert_id)
                .ok_or(LedgerError::AlertNotFound(alert_id))?;
            if alert.acknowledged() {
                return Err(LedgerError::AlertAlreadyAcknowledged(alert_id));
            }
            alert.acknowledge(actor.user_id, now);
            let acknowledged = alert.clone();

            tracing::info!(
                alert_id = %alert_id,
                item_id = %acknowledged.inventory_item_id(),
                user = %actor.user_name,
                "low-stock alert acknowledged"
            );
            self.publish(&mut Effects {
                events: vec![LedgerEvent::AlertAcknowledged(AlertAcknowledged {
                    alert_id,
                    item_id: acknowledged.inventory_item_id(),
                    acknowledged_by: actor.user_id,
                    occurred_at: now,
                })],
                raised: Vec::new(),
            });
            acknowledged
        };

        Ok(acknowledged)
    }

    // ---------------------------------------------------------------------
    // Reporting
    // ---------------------------------------------------------------------

    pub fn stats(&self, vendor_id: Option<VendorId>) -> LedgerResult<InventoryStats> {
        let items = self.items(vendor_id)?;
        Ok(InventoryStats::compute(&items))
    }

    /// Items at or below their reorder point, regardless of alert state.
    pub fn reorder_list(&self, vendor_id: Option<VendorId>) -> LedgerResult<Vec<ReorderEntry>> {
        let items = self.items(vendor_id)?;
        Ok(report::reorder_list(&items))
    }

    pub fn expiring_items(&self, within: Duration, now: DateTime<Utc>) -> LedgerResult<Vec<InventoryItem>> {
        let items = self.items(None)?;
        Ok(report::expiring_items(&items, within, now))
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    /// Consistent copy of the whole ledger.
    ///
    /// Holds every item lock while the history is copied, so no movement can
    /// land between the item states and the log.
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let catalog = self.catalog.read().map_err(|_| LedgerError::Poisoned)?;
        let mut slots: Vec<(&InventoryItemId, &SharedSlot)> = catalog.items.iter().collect();
        slots.sort_by_key(|(id, _)| **id);

        let guards = slots
            .into_iter()
            .map(|(_, slot)| slot.lock().map_err(|_| LedgerError::Poisoned))
            .collect::<LedgerResult<Vec<MutexGuard<'_, ItemSlot>>>>()?;

        let movements = self.movements.read().map_err(|_| LedgerError::Poisoned)?.clone();
        let alerts = self.alerts.lock().map_err(|_| LedgerError::Poisoned)?.clone();
        let items = guards.iter().map(|g| g.item.clone()).collect();

        Ok(LedgerSnapshot {
            taken_at: Utc::now(),
            items,
            movements,
            alerts,
        })
    }

    /// Rebuild a ledger from a snapshot after validating it.
    pub fn restore(snapshot: LedgerSnapshot, config: LedgerConfig) -> LedgerResult<Self> {
        snapshot.validate()?;

        let mut catalog = Catalog::default();
        for item in snapshot.items {
            catalog
                .skus
                .insert((item.vendor_id(), item.sku().to_string()), item.id_typed());
            catalog.items.insert(
                item.id_typed(),
                Arc::new(Mutex::new(ItemSlot { item, removed: false })),
            );
        }

        tracing::info!(
            items = catalog.items.len(),
            movements = snapshot.movements.len(),
            alerts = snapshot.alerts.len(),
            taken_at = %snapshot.taken_at,
            "ledger restored from snapshot"
        );

        Ok(Self {
            config,
            catalog: RwLock::new(catalog),
            movements: RwLock::new(snapshot.movements),
            alerts: Mutex::new(snapshot.alerts),
            subscribers: SubscriberRegistry::new(),
            bus: InMemoryEventBus::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn slot(&self, item_id: InventoryItemId) -> LedgerResult<SharedSlot> {
        let catalog = self.catalog.read().map_err(|_| LedgerError::Poisoned)?;
        catalog
            .items
            .get(&item_id)
            .cloned()
            .ok_or(LedgerError::ItemNotFound(item_id))
    }

    fn mutate<T>(
        &self,
        item_id: InventoryItemId,
        actor: &Actor,
        op: impl FnOnce(&mut StockTxn<'_>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let slot = self.slot(item_id)?;
        let mut effects = Effects::default();

        let result = {
            let mut guard = lock_slot(&slot, item_id)?;
            let mut txn = StockTxn {
                ledger: self,
                slot: &mut *guard,
                actor,
                effects: &mut effects,
            };
            let result = op(&mut txn);
            self.publish(&mut effects);
            result
        };

        self.notify_subscribers(effects);
        result
    }

    /// Raise an alert for the item's current level unless an open one of the
    /// same severity exists. Older alerts of other severities are left alone.
    fn evaluate_alerts(&self, item: &InventoryItem, now: DateTime<Utc>, effects: &mut Effects) {
        let Some(severity) = AlertSeverity::evaluate(
            item.current_stock(),
            item.thresholds().reorder_point,
            self.config.critical_percent,
        ) else {
            return;
        };

        let mut alerts = match self.alerts.lock() {
            Ok(alerts) => alerts,
            Err(_) => {
                tracing::warn!(item_id = %item.id_typed(), "alert store poisoned; alert skipped");
                return;
            }
        };

        if alerts.iter().any(|a| a.is_open_for(item.id_typed(), severity)) {
            return;
        }

        let alert = LowStockAlert::raise(item, severity, now);
        alerts.push(alert.clone());

        tracing::info!(
            alert_id = %alert.id_typed(),
            item_id = %item.id_typed(),
            severity = %severity,
            current_stock = item.current_stock(),
            reorder_point = item.thresholds().reorder_point,
            "low-stock alert raised"
        );
        effects.events.push(LedgerEvent::AlertRaised(alert.clone()));
        effects.raised.push(alert);
        // Published before the store is unlocked so an acknowledgement can
        // never reach the bus ahead of the raise.
        self.publish(effects);
    }

    /// Publish queued events. Callers hold the lock that ordered them.
    fn publish(&self, effects: &mut Effects) {
        let events = std::mem::take(&mut effects.events);
        if !self.config.publish_events {
            return;
        }
        for event in events {
            if let Err(err) = self.bus.publish(event) {
                tracing::warn!(error = %err, "failed to publish ledger event");
            }
        }
    }

    /// Run alert callbacks. Called with no ledger lock held.
    fn notify_subscribers(&self, effects: Effects) {
        for alert in &effects.raised {
            self.subscribers.notify(alert);
        }
    }
}

fn lock_slot(slot: &SharedSlot, item_id: InventoryItemId) -> LedgerResult<MutexGuard<'_, ItemSlot>> {
    let guard = slot.lock().map_err(|_| LedgerError::Poisoned)?;
    if guard.removed {
        return Err(LedgerError::ItemNotFound(item_id));
    }
    Ok(guard)
}

fn ensure_non_negative(quantity: i64) -> LedgerResult<()> {
    if quantity < 0 {
        return Err(LedgerError::NegativeQuantity(quantity));
    }
    Ok(())
}

fn ensure_reserved(item: &InventoryItem, quantity: i64) -> LedgerResult<()> {
    ensure_non_negative(quantity)?;
    let reserved = item.reserved_stock();
    if quantity > reserved {
        return Err(LedgerError::InsufficientReserved {
            requested: quantity,
            reserved,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use stockledger_core::{ProductId, UserId};

    use super::*;
    use crate::item::StockThresholds;

    fn actor() -> Actor {
        Actor::new(UserId::new(), "warehouse")
    }

    fn ledger() -> InventoryLedger {
        InventoryLedger::default()
    }

    fn add(ledger: &InventoryLedger, current: i64, reserved: i64, reorder_point: i64) -> InventoryItem {
        ledger
            .add_item(
                NewInventoryItem::new(ProductId::new(), "Oak chair", "CHAIR-OAK", VendorId::new(), "Acme")
                    .with_stock(current, reserved)
                    .with_thresholds(reorder_point, 20, 2)
                    .with_pricing(1_500, 4_900),
            )
            .unwrap()
    }

    fn movement_count(ledger: &InventoryLedger) -> usize {
        ledger
            .movements(&MovementFilter::default().with_limit(usize::MAX))
            .unwrap()
            .len()
    }

    fn open_alerts(ledger: &InventoryLedger, item_id: InventoryItemId) -> Vec<LowStockAlert> {
        ledger.alerts(&AlertFilter::for_item(item_id)).unwrap()
    }

    #[test]
    fn out_movement_scenario_raises_low_alert() {
        let ledger = ledger();
        let item = add(&ledger, 15, 3, 10);
        assert_eq!(item.available_stock(), 12);
        assert!(open_alerts(&ledger, item.id_typed()).is_empty());

        let movement = ledger
            .update_stock(item.id_typed(), 10, MovementType::Out, "sold", &actor())
            .unwrap();
        assert_eq!(movement.previous_stock(), 15);
        assert_eq!(movement.new_stock(), 5);

        let item = ledger.item(item.id_typed()).unwrap();
        assert_eq!(item.current_stock(), 5);
        assert_eq!(item.available_stock(), 2);

        let alerts = open_alerts(&ledger, item.id_typed());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity(), AlertSeverity::Low);
        assert_eq!(alerts[0].current_stock(), 5);
    }

    #[test]
    fn zero_stock_is_out_of_stock_even_with_zero_reorder_point() {
        let ledger = ledger();
        let item = add(&ledger, 4, 0, 0);
        assert!(open_alerts(&ledger, item.id_typed()).is_empty());

        ledger
            .update_stock(item.id_typed(), 4, MovementType::Out, "sold", &actor())
            .unwrap();

        let alerts = open_alerts(&ledger, item.id_typed());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity(), AlertSeverity::OutOfStock);
    }

    #[test]
    fn adding_an_empty_item_raises_out_of_stock() {
        let ledger = ledger();
        let item = add(&ledger, 0, 0, 10);
        let alerts = open_alerts(&ledger, item.id_typed());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity(), AlertSeverity::OutOfStock);
    }

    #[test]
    fn adjustment_is_idempotent() {
        let ledger = ledger();
        let item = add(&ledger, 30, 0, 5);
        let id = item.id_typed();

        ledger.update_stock(id, 12, MovementType::Adjustment, "count", &actor()).unwrap();
        assert_eq!(ledger.item(id).unwrap().current_stock(), 12);

        let second = ledger
            .update_stock(id, 12, MovementType::Adjustment, "recount", &actor())
            .unwrap();
        assert_eq!(ledger.item(id).unwrap().current_stock(), 12);
        assert_eq!(second.previous_stock(), 12);
        assert_eq!(second.new_stock(), 12);
        assert_eq!(movement_count(&ledger), 2);
    }

    #[test]
    fn reservation_round_trip_restores_counters() {
        let ledger = ledger();
        let item = add(&ledger, 20, 2, 5);
        let id = item.id_typed();
        let before = movement_count(&ledger);

        ledger.reserve_stock(id, 7, &actor(), "ORD-1").unwrap();
        let reserved = ledger.item(id).unwrap();
        assert_eq!(reserved.reserved_stock(), 9);
        assert_eq!(reserved.available_stock(), 11);

        ledger.release_stock(id, 7, &actor(), "ORD-1").unwrap();
        let released = ledger.item(id).unwrap();
        assert_eq!(released.reserved_stock(), item.reserved_stock());
        assert_eq!(released.available_stock(), item.available_stock());
        assert_eq!(movement_count(&ledger), before + 2);
    }

    #[test]
    fn fulfillment_records_release_then_out() {
        let ledger = ledger();
        let item = add(&ledger, 20, 0, 5);
        let id = item.id_typed();
        ledger.reserve_stock(id, 6, &actor(), "ORD-7").unwrap();
        let before = movement_count(&ledger);

        let fulfilled = ledger.fulfill_order(id, 6, &actor(), "ORD-7").unwrap();

        let item = ledger.item(id).unwrap();
        assert_eq!(item.reserved_stock(), 0);
        assert_eq!(item.current_stock(), 14);
        assert_eq!(movement_count(&ledger), before + 2);

        assert_eq!(fulfilled.released.movement_type(), MovementType::Released);
        assert_eq!(fulfilled.shipped.movement_type(), MovementType::Out);
        assert!(fulfilled.released.sequence() < fulfilled.shipped.sequence());
        assert_eq!(fulfilled.shipped.reference(), Some("ORD-7"));

        // Newest first.
        let recent = ledger
            .movements(&MovementFilter::for_item(id).with_limit(2))
            .unwrap();
        assert_eq!(recent[0].movement_type(), MovementType::Out);
        assert_eq!(recent[1].movement_type(), MovementType::Released);
    }

    #[test]
    fn over_reservation_fails_without_movements() {
        let ledger = ledger();
        let item = add(&ledger, 10, 4, 2);
        let before = movement_count(&ledger);

        let err = ledger.reserve_stock(item.id_typed(), 7, &actor(), "ORD-2").unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientAvailable {
                requested: 7,
                available: 6
            }
        );
        assert!(err.is_insufficient_stock());
        assert_eq!(movement_count(&ledger), before);
        assert_eq!(ledger.item(item.id_typed()).unwrap(), item);
    }

    #[test]
    fn release_and_fulfill_require_reserved_stock() {
        let ledger = ledger();
        let item = add(&ledger, 10, 1, 2);
        let id = item.id_typed();

        let err = ledger.release_stock(id, 2, &actor(), "ORD-3").unwrap_err();
        assert_eq!(err, LedgerError::InsufficientReserved { requested: 2, reserved: 1 });

        let err = ledger.fulfill_order(id, 2, &actor(), "ORD-3").unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientReserved { .. }));
        assert_eq!(movement_count(&ledger), 0);
    }

    #[test]
    fn unknown_item_is_not_found() {
        let ledger = ledger();
        let missing = InventoryItemId::new();

        let err = ledger
            .update_stock(missing, 1, MovementType::In, "restock", &actor())
            .unwrap_err();
        assert_eq!(err, LedgerError::ItemNotFound(missing));
        assert!(err.is_not_found());
        assert!(ledger.reserve_stock(missing, 1, &actor(), "ORD").unwrap_err().is_not_found());
        assert!(ledger.item(missing).unwrap_err().is_not_found());
    }

    #[test]
    fn negative_quantities_are_rejected() {
        let ledger = ledger();
        let item = add(&ledger, 10, 0, 2);

        let err = ledger
            .update_stock(item.id_typed(), -5, MovementType::In, "typo", &actor())
            .unwrap_err();
        assert_eq!(err, LedgerError::NegativeQuantity(-5));
        let err = ledger.reserve_stock(item.id_typed(), -1, &actor(), "ORD").unwrap_err();
        assert_eq!(err, LedgerError::NegativeQuantity(-1));
        assert_eq!(movement_count(&ledger), 0);
    }

    #[test]
    fn repeated_low_updates_produce_one_open_alert() {
        let ledger = ledger();
        let item = add(&ledger, 30, 0, 10);
        let id = item.id_typed();

        for level in [10, 9, 8, 7, 9] {
            ledger.update_stock(id, level, MovementType::Adjustment, "count", &actor()).unwrap();
        }

        let alerts = open_alerts(&ledger, id);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity(), AlertSeverity::Low);
    }

    #[test]
    fn severity_escalation_keeps_older_alerts() {
        let ledger = ledger();
        let item = add(&ledger, 30, 0, 10);
        let id = item.id_typed();

        ledger.update_stock(id, 8, MovementType::Adjustment, "count", &actor()).unwrap();
        ledger.update_stock(id, 4, MovementType::Adjustment, "count", &actor()).unwrap();
        ledger.update_stock(id, 0, MovementType::Adjustment, "count", &actor()).unwrap();

        let mut severities: Vec<_> = open_alerts(&ledger, id).iter().map(|a| a.severity()).collect();
        severities.sort();
        assert_eq!(
            severities,
            vec![AlertSeverity::Low, AlertSeverity::Critical, AlertSeverity::OutOfStock]
        );
    }

    #[test]
    fn restocking_does_not_clear_alerts() {
        let ledger = ledger();
        let item = add(&ledger, 5, 0, 10);
        let id = item.id_typed();
        assert_eq!(open_alerts(&ledger, id).len(), 1);

        ledger.update_stock(id, 100, MovementType::In, "delivery", &actor()).unwrap();
        assert_eq!(open_alerts(&ledger, id).len(), 1);
    }

    #[test]
    fn acknowledged_alerts_leave_listing_but_stay_in_history() {
        let ledger = ledger();
        let item = add(&ledger, 8, 0, 10);
        let id = item.id_typed();
        let alert = open_alerts(&ledger, id).remove(0);
        let who = actor();

        let acked = ledger.acknowledge_alert(alert.id_typed(), &who).unwrap();
        assert!(acked.acknowledged());
        assert_eq!(acked.acknowledged_by(), Some(who.user_id));
        assert!(acked.acknowledged_at().is_some());

        assert!(open_alerts(&ledger, id).is_empty());
        let all = ledger
            .alerts(&AlertFilter::for_item(id).including_acknowledged())
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(ledger.alert_history().unwrap().len(), 1);
        assert_eq!(ledger.item(id).unwrap(), item);

        let err = ledger.acknowledge_alert(alert.id_typed(), &who).unwrap_err();
        assert_eq!(err, LedgerError::AlertAlreadyAcknowledged(alert.id_typed()));
        let missing = AlertId::new();
        assert_eq!(
            ledger.acknowledge_alert(missing, &who).unwrap_err(),
            LedgerError::AlertNotFound(missing)
        );
    }

    #[test]
    fn acknowledged_alert_is_raised_again_on_next_mutation() {
        let ledger = ledger();
        let item = add(&ledger, 8, 0, 10);
        let id = item.id_typed();
        let alert = open_alerts(&ledger, id).remove(0);
        ledger.acknowledge_alert(alert.id_typed(), &actor()).unwrap();

        ledger.update_stock(id, 1, MovementType::Out, "sold", &actor()).unwrap();

        let open = open_alerts(&ledger, id);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].severity(), AlertSeverity::Low);
        assert_ne!(open[0].id_typed(), alert.id_typed());
    }

    #[test]
    fn out_beyond_reservations_trims_them() {
        let ledger = ledger();
        let item = add(&ledger, 10, 8, 2);

        let movement = ledger
            .update_stock(item.id_typed(), 5, MovementType::Out, "damaged", &actor())
            .unwrap();

        let item = ledger.item(item.id_typed()).unwrap();
        assert_eq!(item.current_stock(), 5);
        assert_eq!(item.reserved_stock(), 5);
        assert!(movement.notes().is_some());
    }

    #[test]
    fn bulk_update_reports_partial_failure() {
        let ledger = ledger();
        let a = add(&ledger, 10, 0, 2);
        let missing = InventoryItemId::new();

        let result = ledger.bulk_update_stock(
            vec![
                BulkStockUpdate {
                    item_id: a.id_typed(),
                    quantity: 5,
                    movement_type: MovementType::In,
                    reason: "delivery".to_string(),
                },
                BulkStockUpdate {
                    item_id: missing,
                    quantity: 5,
                    movement_type: MovementType::In,
                    reason: "delivery".to_string(),
                },
                BulkStockUpdate {
                    item_id: a.id_typed(),
                    quantity: 3,
                    movement_type: MovementType::Out,
                    reason: "sale".to_string(),
                },
            ],
            &actor(),
        );

        assert_eq!(result.success, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures, vec![(missing, LedgerError::ItemNotFound(missing))]);
        assert_eq!(ledger.item(a.id_typed()).unwrap().current_stock(), 12);
    }

    #[test]
    fn duplicate_sku_per_vendor_is_rejected() {
        let ledger = ledger();
        let vendor = VendorId::new();
        let new = |sku: &str, vendor| {
            NewInventoryItem::new(ProductId::new(), "Vase", sku, vendor, "Acme").with_stock(5, 0)
        };

        ledger.add_item(new("VASE-1", vendor)).unwrap();
        let err = ledger.add_item(new("VASE-1", vendor)).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateSku { .. }));

        // Same sku under another vendor is fine.
        ledger.add_item(new("VASE-1", VendorId::new())).unwrap();
        assert!(ledger.find_by_sku(vendor, "VASE-1").unwrap().is_some());
        assert!(ledger.find_by_sku(vendor, "VASE-2").unwrap().is_none());
    }

    #[test]
    fn remove_item_refuses_open_reservations() {
        let ledger = ledger();
        let item = add(&ledger, 10, 0, 2);
        let id = item.id_typed();
        ledger.reserve_stock(id, 3, &actor(), "ORD-9").unwrap();

        let err = ledger.remove_item(id).unwrap_err();
        assert_eq!(err, LedgerError::ItemHasReservations { item_id: id, reserved: 3 });

        ledger.release_stock(id, 3, &actor(), "ORD-9").unwrap();
        ledger.remove_item(id).unwrap();

        assert!(ledger.item(id).unwrap_err().is_not_found());
        assert!(ledger.items(None).unwrap().is_empty());
        // History survives removal.
        assert_eq!(ledger.movements(&MovementFilter::for_item(id)).unwrap().len(), 2);
        // The sku can be reused.
        assert!(ledger.find_by_sku(item.vendor_id(), item.sku()).unwrap().is_none());
    }

    #[test]
    fn update_item_changes_thresholds_and_reevaluates() {
        let ledger = ledger();
        let item = add(&ledger, 12, 0, 10);
        let id = item.id_typed();
        assert!(open_alerts(&ledger, id).is_empty());

        let updated = ledger
            .update_item(
                id,
                ItemUpdate {
                    thresholds: Some(StockThresholds {
                        reorder_point: 30,
                        reorder_quantity: 50,
                        min_stock_level: 10,
                    }),
                    location: Some("Aisle 4".to_string()),
                    ..ItemUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.thresholds().reorder_point, 30);
        assert_eq!(updated.location(), Some("Aisle 4"));
        assert_eq!(updated.current_stock(), 12);
        let alerts = open_alerts(&ledger, id);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity(), AlertSeverity::Critical);
    }

    #[test]
    fn stats_and_reorder_list_follow_current_state() {
        let ledger = ledger();
        let vendor = VendorId::new();
        let chairs = ledger
            .add_item(
                NewInventoryItem::new(ProductId::new(), "Chair", "CHAIR", vendor, "Acme")
                    .with_category("furniture")
                    .with_stock(4, 0)
                    .with_thresholds(5, 10, 1)
                    .with_pricing(100, 250),
            )
            .unwrap();
        ledger
            .add_item(
                NewInventoryItem::new(ProductId::new(), "Rug", "RUG", vendor, "Acme")
                    .with_category("textiles")
                    .with_stock(50, 0)
                    .with_thresholds(5, 10, 1)
                    .with_pricing(20, 60),
            )
            .unwrap();
        add(&ledger, 0, 0, 5);

        let stats = ledger.stats(Some(vendor)).unwrap();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.total_value, 4 * 100 + 50 * 20);
        assert_eq!(stats.low_stock_items, 1);
        assert_eq!(stats.out_of_stock_items, 0);
        assert_eq!(stats.category_breakdown.len(), 2);

        let everything = ledger.stats(None).unwrap();
        assert_eq!(everything.total_items, 3);
        assert_eq!(everything.out_of_stock_items, 1);

        // Acknowledging alerts does not change the reorder list.
        for alert in ledger.alerts(&AlertFilter::for_vendor(vendor)).unwrap() {
            ledger.acknowledge_alert(alert.id_typed(), &actor()).unwrap();
        }
        let reorder = ledger.reorder_list(Some(vendor)).unwrap();
        assert_eq!(reorder.len(), 1);
        assert_eq!(reorder[0].item_id, chairs.id_typed());

        ledger
            .update_stock(chairs.id_typed(), 20, MovementType::In, "delivery", &actor())
            .unwrap();
        assert!(ledger.reorder_list(Some(vendor)).unwrap().is_empty());
        assert_eq!(ledger.stats(Some(vendor)).unwrap().low_stock_items, 0);
    }

    #[test]
    fn expiring_items_are_listed() {
        let ledger = ledger();
        let now = Utc::now();
        ledger
            .add_item(
                NewInventoryItem::new(ProductId::new(), "Yogurt", "YOG", VendorId::new(), "Dairy")
                    .with_stock(10, 0)
                    .with_expiry(now + Duration::days(3), Some("LOT-4".to_string())),
            )
            .unwrap();
        add(&ledger, 10, 0, 2);

        let expiring = ledger.expiring_items(Duration::days(5), now).unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].sku(), "YOG");
        assert!(ledger.expiring_items(Duration::days(1), now).unwrap().is_empty());
        assert_eq!(ledger.expiring_items(Duration::MAX, now).unwrap().len(), 1);
    }

    #[test]
    fn movement_history_respects_default_limit() {
        let ledger = InventoryLedger::new(LedgerConfig {
            default_history_limit: 3,
            ..LedgerConfig::default()
        });
        let item = add(&ledger, 100, 0, 2);
        for _ in 0..5 {
            ledger
                .update_stock(item.id_typed(), 1, MovementType::Out, "sale", &actor())
                .unwrap();
        }

        let recent = ledger.movements(&MovementFilter::default()).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].new_stock(), 95);
        let ins = ledger
            .movements(&MovementFilter {
                movement_type: Some(MovementType::In),
                ..MovementFilter::default()
            })
            .unwrap();
        assert!(ins.is_empty());
    }

    #[test]
    fn subscribers_receive_new_alerts_only() {
        let ledger = ledger();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        ledger.register_subscriber(Arc::new(move |_: &LowStockAlert| -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        ledger.register_subscriber(Arc::new(|_: &LowStockAlert| -> anyhow::Result<()> {
            anyhow::bail!("push provider down")
        }));

        let item = add(&ledger, 30, 0, 10);
        let id = item.id_typed();
        ledger.update_stock(id, 9, MovementType::Adjustment, "count", &actor()).unwrap();
        ledger.update_stock(id, 8, MovementType::Adjustment, "count", &actor()).unwrap();
        ledger.update_stock(id, 0, MovementType::Adjustment, "count", &actor()).unwrap();

        // Low once, then OutOfStock; the failing subscriber changes nothing.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ledger.item(id).unwrap().current_stock(), 0);
    }

    #[test]
    fn bus_subscribers_see_events_in_order() {
        let ledger = ledger();
        let sub = ledger.subscribe();

        let item = add(&ledger, 12, 0, 10);
        ledger
            .update_stock(item.id_typed(), 3, MovementType::Out, "sale", &actor())
            .unwrap();

        let types: Vec<&'static str> = sub
            .drain()
            .iter()
            .map(stockledger_events::Event::event_type)
            .collect();
        assert_eq!(
            types,
            vec!["inventory.item.added", "inventory.stock.moved", "inventory.alert.raised"]
        );
    }

    #[test]
    fn bus_events_can_be_filtered_by_topic() {
        use stockledger_events::Event;

        let ledger = ledger();
        let sub = ledger.subscribe();
        let item = add(&ledger, 8, 0, 10);
        let alert = open_alerts(&ledger, item.id_typed()).remove(0);
        ledger.acknowledge_alert(alert.id_typed(), &actor()).unwrap();

        let alert_events: Vec<LedgerEvent> = sub
            .drain()
            .into_iter()
            .filter(|e| e.in_topic("inventory.alert"))
            .collect();
        assert_eq!(alert_events.len(), 2);
        assert!(matches!(alert_events[1], LedgerEvent::AlertAcknowledged(_)));
        assert!(alert_events.iter().all(|e| e.item_id() == item.id_typed()));
    }

    #[test]
    fn bus_order_per_item_follows_lock_order() {
        use std::collections::HashMap;
        use stockledger_events::Event;

        let ledger = Arc::new(ledger());
        let sub = ledger.subscribe();
        let vendor = VendorId::new();

        // Restock every item as soon as it becomes visible.
        let restocker = {
            let ledger = ledger.clone();
            std::thread::spawn(move || {
                let who = actor();
                for n in 0..20 {
                    let sku = format!("EMPTY-{n}");
                    loop {
                        if let Some(item) = ledger.find_by_sku(vendor, &sku).unwrap() {
                            ledger
                                .update_stock(item.id_typed(), 5, MovementType::In, "delivery", &who)
                                .unwrap();
                            break;
                        }
                        std::thread::yield_now();
                    }
                }
            })
        };
        for n in 0..20 {
            ledger
                .add_item(
                    NewInventoryItem::new(ProductId::new(), "Empty", format!("EMPTY-{n}"), vendor, "Acme")
                        .with_thresholds(1, 5, 0),
                )
                .unwrap();
        }
        restocker.join().unwrap();

        let mut by_item: HashMap<InventoryItemId, Vec<&'static str>> = HashMap::new();
        for event in sub.drain() {
            by_item.entry(event.item_id()).or_default().push(event.event_type());
        }
        assert_eq!(by_item.len(), 20);
        for types in by_item.values() {
            assert_eq!(
                types,
                &vec!["inventory.item.added", "inventory.alert.raised", "inventory.stock.moved"]
            );
        }
        // The initial alert always saw the empty item, never the restocked one.
        for alert in ledger.alert_history().unwrap() {
            assert_eq!(alert.severity(), AlertSeverity::OutOfStock);
            assert_eq!(alert.current_stock(), 0);
        }
    }

    #[test]
    fn blocked_callback_holds_no_item_lock() {
        use std::sync::atomic::AtomicBool;
        use std::sync::mpsc;
        use std::time::Duration as StdDuration;

        let ledger = Arc::new(ledger());
        let item = add(&ledger, 30, 0, 10);
        let id = item.id_typed();
        let sub = ledger.subscribe();

        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        let in_callback = Arc::new(AtomicBool::new(false));
        let flag = in_callback.clone();
        ledger.register_subscriber(Arc::new(move |_: &LowStockAlert| -> anyhow::Result<()> {
            flag.store(true, Ordering::SeqCst);
            entered_tx.lock().unwrap().send(())?;
            let _ = release_rx.lock().unwrap().recv_timeout(StdDuration::from_secs(5));
            flag.store(false, Ordering::SeqCst);
            Ok(())
        }));

        let seller = {
            let ledger = ledger.clone();
            std::thread::spawn(move || {
                ledger
                    .update_stock(id, 22, MovementType::Out, "sale", &actor())
                    .unwrap()
            })
        };
        entered_rx.recv_timeout(StdDuration::from_secs(5)).unwrap();

        // The same item stays writable while its alert callback is blocked,
        // and the alert is already on the bus.
        ledger
            .update_stock(id, 1, MovementType::In, "return", &actor())
            .unwrap();
        assert!(in_callback.load(Ordering::SeqCst));
        let events = sub.drain();
        assert!(events.iter().any(|e| matches!(e, LedgerEvent::AlertRaised(_))));

        release_tx.send(()).unwrap();
        let sold = seller.join().unwrap();
        assert_eq!(sold.new_stock(), 8);
        assert_eq!(ledger.item(id).unwrap().current_stock(), 9);
    }

    #[test]
    fn publishing_can_be_disabled() {
        let ledger = InventoryLedger::new(LedgerConfig {
            publish_events: false,
            ..LedgerConfig::default()
        });
        let sub = ledger.subscribe();
        add(&ledger, 0, 0, 10);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn snapshot_restores_an_equivalent_ledger() {
        let ledger = ledger();
        let item = add(&ledger, 20, 0, 10);
        let id = item.id_typed();
        ledger.reserve_stock(id, 5, &actor(), "ORD-1").unwrap();
        ledger.update_stock(id, 12, MovementType::Out, "sale", &actor()).unwrap();

        let snapshot = ledger.snapshot().unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        let restored = InventoryLedger::restore(decoded, LedgerConfig::default()).unwrap();

        assert_eq!(restored.item(id).unwrap(), ledger.item(id).unwrap());
        assert_eq!(movement_count(&restored), 2);
        assert_eq!(restored.alert_history().unwrap(), ledger.alert_history().unwrap());

        // Sequence numbering continues after the restored history.
        let next = restored
            .update_stock(id, 1, MovementType::In, "return", &actor())
            .unwrap();
        assert_eq!(next.sequence(), 3);
        // Duplicate suppression still sees restored alerts.
        assert_eq!(open_alerts(&restored, id).len(), 1);
    }

    #[test]
    fn restore_rejects_broken_invariants() {
        let ledger = ledger();
        add(&ledger, 5, 0, 1);
        let snapshot = ledger.snapshot().unwrap();

        let mut json = serde_json::to_value(&snapshot).unwrap();
        json["items"][0]["reserved_stock"] = serde_json::json!(9);
        let corrupt: LedgerSnapshot = serde_json::from_value(json).unwrap();

        let err = InventoryLedger::restore(corrupt, LedgerConfig::default()).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptSnapshot(_)));
    }

    #[test]
    fn concurrent_reservations_never_oversell() {
        let ledger = Arc::new(ledger());
        let item = add(&ledger, 100, 0, 0);
        let id = item.id_typed();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    let who = Actor::new(UserId::new(), format!("worker-{worker}"));
                    let mut won = 0;
                    for n in 0..20 {
                        if ledger.reserve_stock(id, 1, &who, &format!("ORD-{worker}-{n}")).is_ok() {
                            won += 1;
                        }
                    }
                    won
                })
            })
            .collect();

        let total: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let item = ledger.item(id).unwrap();

        assert_eq!(total, 100);
        assert_eq!(item.reserved_stock(), 100);
        assert_eq!(item.available_stock(), 0);
        assert_eq!(movement_count(&ledger), 100);

        let sequences: Vec<u64> = ledger
            .movements(&MovementFilter::default().with_limit(usize::MAX))
            .unwrap()
            .iter()
            .map(StockMovement::sequence)
            .collect();
        assert!(sequences.windows(2).all(|w| w[0] == w[1] + 1));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Update(MovementType, i64),
            Reserve(i64),
            Release(i64),
            Fulfill(i64),
        }

        fn op() -> impl Strategy<Value = Op> {
            let movement_type = prop_oneof![
                Just(MovementType::In),
                Just(MovementType::Out),
                Just(MovementType::Adjustment),
                Just(MovementType::Reserved),
                Just(MovementType::Released),
            ];
            prop_oneof![
                (movement_type, 0i64..60).prop_map(|(t, q)| Op::Update(t, q)),
                (0i64..30).prop_map(Op::Reserve),
                (0i64..30).prop_map(Op::Release),
                (0i64..30).prop_map(Op::Fulfill),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: quantities stay consistent and every successful
            /// operation leaves exactly its movements behind.
            #[test]
            fn invariants_hold_after_any_sequence(
                start in 0i64..50,
                reorder_point in 0i64..20,
                ops in prop::collection::vec(op(), 1..40)
            ) {
                let ledger = InventoryLedger::default();
                let item = add(&ledger, start, 0, reorder_point);
                let id = item.id_typed();
                let who = actor();
                let mut expected_movements = 0;

                for op in ops {
                    let recorded = match op {
                        Op::Update(t, q) => ledger.update_stock(id, q, t, "prop", &who).map(|_| 1),
                        Op::Reserve(q) => ledger.reserve_stock(id, q, &who, "P").map(|_| 1),
                        Op::Release(q) => ledger.release_stock(id, q, &who, "P").map(|_| 1),
                        Op::Fulfill(q) => ledger.fulfill_order(id, q, &who, "P").map(|_| 2),
                    };
                    if let Ok(n) = recorded {
                        expected_movements += n;
                    }

                    let item = ledger.item(id).unwrap();
                    prop_assert!(item.current_stock() >= 0);
                    prop_assert!(item.reserved_stock() >= 0);
                    prop_assert!(item.reserved_stock() <= item.current_stock());
                    prop_assert_eq!(
                        item.available_stock(),
                        item.current_stock() - item.reserved_stock()
                    );
                }

                prop_assert_eq!(movement_count(&ledger), expected_movements);

                // At most one open alert per severity.
                let open = open_alerts(&ledger, id);
                for severity in [AlertSeverity::Low, AlertSeverity::Critical, AlertSeverity::OutOfStock] {
                    prop_assert!(open.iter().filter(|a| a.severity() == severity).count() <= 1);
                }
            }

            /// Property: each movement's before/after values match its type.
            #[test]
            fn movements_are_consistent_with_their_type(
                start in 0i64..50,
                ops in prop::collection::vec((0usize..3, 0i64..40), 1..30)
            ) {
                let ledger = InventoryLedger::default();
                let item = add(&ledger, start, 0, 5);
                let id = item.id_typed();
                let types = [MovementType::In, MovementType::Out, MovementType::Adjustment];

                for (t, q) in ops {
                    ledger.update_stock(id, q, types[t], "prop", &actor()).unwrap();
                }

                for m in ledger.movements(&MovementFilter::for_item(id).with_limit(usize::MAX)).unwrap() {
                    let expected = match m.movement_type() {
                        MovementType::In => m.previous_stock() + m.quantity(),
                        MovementType::Out => (m.previous_stock() - m.quantity()).max(0),
                        MovementType::Adjustment => m.quantity(),
                        _ => unreachable!(),
                    };
                    prop_assert_eq!(m.new_stock(), expected);
                }
            }
        }
    }
}
