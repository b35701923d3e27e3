//! Uniform repository contract implemented by every storage adapter.

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::PersistenceResult;
use crate::id::EntityId;
use crate::provider::Provider;
use crate::storage_key::StorageKey;

/// Whether reading an entity back yields everything that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTrip {
    Lossless,
    /// The listed fields are never persisted; they read back empty/default.
    Lossy { dropped_fields: Vec<&'static str> },
}

impl RoundTrip {
    pub fn is_lossless(&self) -> bool {
        matches!(self, RoundTrip::Lossless)
    }
}

/// CRUD access to one entity type on the active provider.
///
/// ## Semantics per provider
///
/// - **Relational**: `add`, `update` and `delete` are staged and only become
///   durable when the owning unit of work saves.
/// - **Document / Graph**: every call is applied and durable immediately.
///
/// Missing identities are not errors: `get_by_id` returns `None` and `delete`
/// is a no-op.
///
/// `find` always materializes the full set and filters in process; predicates
/// are never pushed down to the engine.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    fn provider(&self) -> Provider;

    fn storage_key(&self) -> &StorageKey;

    /// Declares which fields survive a write/read cycle on this provider.
    fn round_trip(&self) -> RoundTrip {
        RoundTrip::Lossless
    }

    async fn get_by_id(&self, id: EntityId) -> PersistenceResult<Option<E>>;

    async fn add(&self, entity: &E) -> PersistenceResult<()>;

    /// Full-record replace by identity.
    async fn update(&self, entity: &E) -> PersistenceResult<()>;

    async fn delete(&self, id: EntityId) -> PersistenceResult<()>;

    /// Detached snapshot; mutating the returned values persists nothing.
    async fn get_all(&self) -> PersistenceResult<Vec<E>>;

    async fn find(
        &self,
        predicate: &(dyn for<'a> Fn(&'a E) -> bool + Send + Sync),
    ) -> PersistenceResult<Vec<E>> {
        let all = self.get_all().await?;
        Ok(all.into_iter().filter(|e| predicate(e)).collect())
    }
}
