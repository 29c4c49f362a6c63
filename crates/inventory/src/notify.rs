//! Adapter from alerts to user-facing notifications.
//!
//! The delivery channel (email, push, SMS, in-app) sits behind
//! [`NotificationSink`]; the ledger only hands it a flat message.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use stockledger_core::VendorId;

use crate::alert::{AlertSeverity, LowStockAlert};
use crate::subscriber::AlertSubscriber;

/// Message payload handed to a notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockNotification {
    pub product_name: String,
    pub current_stock: i64,
    pub reorder_point: i64,
    pub vendor_id: VendorId,
    pub severity: AlertSeverity,
}

impl From<&LowStockAlert> for StockNotification {
    fn from(alert: &LowStockAlert) -> Self {
        Self {
            product_name: alert.product_name().to_string(),
            current_stock: alert.current_stock(),
            reorder_point: alert.reorder_point(),
            vendor_id: alert.vendor_id(),
            severity: alert.severity(),
        }
    }
}

impl StockNotification {
    pub fn subject(&self) -> String {
        match self.severity {
            AlertSeverity::OutOfStock => format!("{} is out of stock", self.product_name),
            AlertSeverity::Critical => format!("{} is critically low", self.product_name),
            AlertSeverity::Low => format!("{} is running low", self.product_name),
        }
    }

    pub fn body(&self) -> String {
        format!(
            "{} has {} units left (reorder point {}).",
            self.product_name, self.current_stock, self.reorder_point
        )
    }
}

/// A notification delivery channel.
pub trait NotificationSink: Send + Sync {
    fn send(&self, notification: &StockNotification) -> anyhow::Result<()>;

    /// Channel name for logging.
    fn name(&self) -> &'static str;
}

/// Turns raised alerts into notifications on a sink.
#[derive(Debug)]
pub struct NotifyingSubscriber<S> {
    sink: S,
    min_severity: AlertSeverity,
}

impl<S> NotifyingSubscriber<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            min_severity: AlertSeverity::Low,
        }
    }

    /// Only forward alerts at or above `severity`.
    pub fn with_min_severity(mut self, severity: AlertSeverity) -> Self {
        self.min_severity = severity;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: NotificationSink> AlertSubscriber for NotifyingSubscriber<S> {
    fn on_alert(&self, alert: &LowStockAlert) -> anyhow::Result<()> {
        if alert.severity() < self.min_severity {
            return Ok(());
        }
        let notification = StockNotification::from(alert);
        self.sink
            .send(&notification)
            .with_context(|| format!("{} sink rejected alert {}", self.sink.name(), alert.id_typed()))
    }

    fn name(&self) -> &str {
        self.sink.name()
    }
}

/// Sink that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn send(&self, notification: &StockNotification) -> anyhow::Result<()> {
        match notification.severity {
            AlertSeverity::Low => tracing::info!(
                vendor_id = %notification.vendor_id,
                current_stock = notification.current_stock,
                reorder_point = notification.reorder_point,
                "{}",
                notification.subject()
            ),
            AlertSeverity::Critical | AlertSeverity::OutOfStock => tracing::warn!(
                vendor_id = %notification.vendor_id,
                current_stock = notification.current_stock,
                reorder_point = notification.reorder_point,
                "{}",
                notification.subject()
            ),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
