//! Value objects: compared by value, never by identity.
//!
//! Order lines and recipe requirements are values. Two lines for the same menu
//! item with the same quantity and price are interchangeable.

/// Marker trait for immutable, value-compared domain objects.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
