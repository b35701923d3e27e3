//! Value object trait: equality by value, not identity.

/// Marker trait for value objects embedded in entities.
///
/// Value objects have no identity of their own, so they are never persisted
/// through a repository. They travel inside an entity as `List` or `Nested`
/// fields of its schema, which is why the graph provider drops them.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
