//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stored documents (users, pets, edit records) implement this so storage
/// adapters can key collections generically.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Name of the collection the entity is stored in (also used in edit records).
    fn collection() -> &'static str;
}
