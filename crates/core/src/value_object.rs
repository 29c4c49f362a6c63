//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// In the ledger, reorder thresholds and unit pricing are value objects: two
/// items with the same thresholds share nothing but equal values.
///
/// "Modifying" a value object means replacing it wholesale:
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Pricing {
///     unit_cost: i64,
///     unit_price: i64,
/// }
///
/// impl ValueObject for Pricing {}
///
/// item.pricing = Pricing { unit_cost: 120, unit_price: 199 };
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {
    /// Check the value's own constraints.
    ///
    /// Defaults to accepting everything; override when a value has rules
    /// (e.g. non-negative quantities).
    fn validate(&self) -> crate::DomainResult<()> {
        Ok(())
    }
}
