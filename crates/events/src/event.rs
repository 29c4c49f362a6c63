use chrono::{DateTime, Utc};

/// A fact published on the bus after the state it describes was committed.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted type name, e.g. `"inventory.stock.moved"`.
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;

    /// Payload schema version. Bump when a variant's fields change meaning.
    fn version(&self) -> u32 {
        1
    }

    /// Whether the type name falls under `topic`, matched on whole dotted
    /// segments (`"inventory.alert"` matches `"inventory.alert.raised"` but
    /// not `"inventory.alerts"`).
    fn in_topic(&self, topic: &str) -> bool {
        let name = self.event_type();
        name == topic
            || name
                .strip_prefix(topic)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}
