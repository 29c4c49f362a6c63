//! Records with identity.

/// A ledger record identified by a typed id that never changes.
///
/// Items, movements and alerts are entities; thresholds and pricing are
/// value objects compared by content.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> Self::Id;
}

/// First id that occurs more than once in `records`, if any.
pub fn first_duplicate_id<'a, E>(records: impl IntoIterator<Item = &'a E>) -> Option<E::Id>
where
    E: Entity + 'a,
{
    let mut seen = std::collections::HashSet::new();
    records.into_iter().map(Entity::id).find(|id| !seen.insert(*id))
}
