//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Companies, users and team members are entities: two records with equal
/// field values but different ids are different records.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
