//! Unit of work over the active provider.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use polystore_core::{
    Cancellation, Entity, PersistenceError, PersistenceResult, Provider, Repository, UnitOfWork,
};

use crate::factory::ProviderSession;

/// Typed repository container, built once per unit of work.
///
/// Each value is an `Arc<dyn Repository<E>>` stored under `TypeId::of::<E>()`.
#[derive(Default)]
pub(crate) struct RepositorySet {
    by_type: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RepositorySet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            by_type: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert<E: Entity>(&mut self, repository: Arc<dyn Repository<E>>) {
        self.by_type.insert(TypeId::of::<E>(), Box::new(repository));
    }

    pub(crate) fn get<E: Entity>(&self) -> Option<Arc<dyn Repository<E>>> {
        self.by_type
            .get(&TypeId::of::<E>())
            .and_then(|repo| repo.downcast_ref::<Arc<dyn Repository<E>>>())
            .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_type.len()
    }
}

/// Unit of work produced by [`RepositoryFactory`](crate::RepositoryFactory).
///
/// Relational: staged writes, real transactions. Document and graph: writes
/// are durable immediately and the transaction methods only log.
pub struct StoreUnitOfWork {
    session: ProviderSession,
    repositories: RepositorySet,
    cancellation: Cancellation,
}

impl StoreUnitOfWork {
    pub(crate) fn new(
        session: ProviderSession,
        repositories: RepositorySet,
        cancellation: Cancellation,
    ) -> Self {
        Self {
            session,
            repositories,
            cancellation,
        }
    }

    pub fn session(&self) -> &ProviderSession {
        &self.session
    }
}

impl core::fmt::Debug for StoreUnitOfWork {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreUnitOfWork")
            .field("provider", &self.session.provider())
            .field("repositories", &self.repositories.len())
            .finish()
    }
}

#[async_trait]
impl UnitOfWork for StoreUnitOfWork {
    fn provider(&self) -> Provider {
        self.session.provider()
    }

    fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    fn repository<E: Entity>(&self) -> PersistenceResult<Arc<dyn Repository<E>>> {
        self.repositories
            .get::<E>()
            .ok_or_else(PersistenceError::unregistered::<E>)
    }

    #[instrument(skip(self), fields(provider = %self.provider()), err)]
    async fn save_changes(&mut self) -> PersistenceResult<u64> {
        match &self.session {
            ProviderSession::Relational(session) => session.save_changes().await,
            ProviderSession::Document(session) => Ok(session.take_writes()),
            ProviderSession::Graph(session) => Ok(session.take_writes()),
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider()), err)]
    async fn begin_transaction(&mut self) -> PersistenceResult<()> {
        match &self.session {
            ProviderSession::Relational(session) => session.begin().await,
            _ => {
                debug!("provider has no transactions; begin is a no-op");
                Ok(())
            }
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider()), err)]
    async fn commit_transaction(&mut self) -> PersistenceResult<()> {
        match &self.session {
            ProviderSession::Relational(session) => session.commit().await,
            _ => {
                debug!("provider has no transactions; commit is a no-op");
                Ok(())
            }
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider()), err)]
    async fn rollback_transaction(&mut self) -> PersistenceResult<()> {
        let durable = match &self.session {
            ProviderSession::Relational(session) => return session.rollback().await,
            ProviderSession::Document(session) => session.take_writes(),
            ProviderSession::Graph(session) => session.take_writes(),
        };
        if durable > 0 {
            warn!(
                durable_writes = durable,
                "rollback requested but writes were already applied and stay in place"
            );
        }
        Ok(())
    }
}
