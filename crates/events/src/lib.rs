//! Ledger event plumbing: the `Event` contract and a pub/sub bus.
//!
//! Mechanics only. The inventory crate defines the concrete events.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
