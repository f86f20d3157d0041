//! Entity trait: identity that survives state changes.

/// Anything addressed by a stable identifier (menu items, recipe rows).
pub trait Entity {
    type Id: Clone + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
