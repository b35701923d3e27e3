//! `polystore-core` — persistence abstraction building blocks.
//!
//! This crate holds the provider-independent contracts (entities, repositories,
//! units of work) and the error taxonomy. It contains no storage IO.

pub mod cancel;
pub mod entity;
pub mod error;
pub mod id;
pub mod provider;
pub mod repository;
pub mod storage_key;
pub mod unit_of_work;
pub mod value_object;

pub use cancel::{Cancellation, CancellationSource};
pub use entity::{Entity, EntityRef, EntitySchema, FieldDef, FieldKind, Record};
pub use error::{
    ConfigError, ConstraintKind, PersistenceError, PersistenceResult, TransactionError,
};
pub use id::EntityId;
pub use provider::Provider;
pub use repository::{Repository, RoundTrip};
pub use storage_key::{StorageKey, StorageKeys};
pub use unit_of_work::UnitOfWork;
pub use value_object::ValueObject;
