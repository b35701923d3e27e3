//! Storage adapters behind the persistence contracts of `polystore-core`.
//!
//! - [`registry`]: entity type → storage key per provider
//! - [`relational`], [`document`], [`graph`]: one adapter per provider
//! - [`factory`]: provider × entity type → repository / unit of work
//! - [`config`]: provider selection and backend connection

pub mod config;
pub mod document;
pub mod factory;
pub mod graph;
pub mod immediate;
pub mod registry;
pub mod relational;
pub mod unit_of_work;

pub use config::PersistenceConfig;
pub use factory::{ProviderSession, RepositoryFactory, StorageBackends};
pub use registry::{EntityRegistry, RegisteredEntity, default_registry};
pub use unit_of_work::StoreUnitOfWork;
