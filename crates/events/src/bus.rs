//! Event publishing/subscription abstraction (mechanics only).
//!
//! The ledger publishes one event per mutation (stock moved, alert raised,
//! ...). Dashboards and notification workers consume them through a
//! [`Subscription`] on their own thread, so publishing never waits on a
//! consumer.
//!
//! - **Broadcast**: every subscription receives every message published after
//!   it was created.
//! - **Ordered per publisher**: a subscription sees messages in publish order.
//!   The ledger publishes while it still holds the lock that ordered the
//!   change, so per item the stream follows `StockMovement::sequence()`.
//!   Events of different items may interleave; order those by sequence.
//! - **No persistence**: the ledger's movement history is the source of truth;
//!   the bus only distributes.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to an event stream.
///
/// ```ignore
/// let subscription = ledger.subscribe();
///
/// std::thread::spawn(move || {
///     while let Ok(event) = subscription.recv() {
///         render(event);
///     }
/// });
/// ```
///
/// Designed for single-threaded consumption; hand it to one worker.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain every message that is already queued, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Pub/sub contract used by the ledger.
///
/// `publish` must not block on consumers. Implementations are shared across
/// threads, hence `Send + Sync`.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
