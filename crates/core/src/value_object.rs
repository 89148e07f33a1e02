//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** - they have no
/// identity of their own. To "modify" one, construct a new instance; invariant
/// checks run in the constructor so an invalid instance cannot exist.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
