//! Repository factory: the single place that maps a provider to adapters.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, instrument};

use polystore_core::{Cancellation, ConfigError, Entity, PersistenceResult, Provider, Repository};

use crate::document::{DocumentClient, DocumentRepository};
use crate::graph::{GraphClient, GraphRepository};
use crate::immediate::ImmediateSession;
use crate::registry::{EntityRegistry, RegisteredEntity};
use crate::relational::{RelationalRepository, RelationalSession};
use crate::unit_of_work::{RepositorySet, StoreUnitOfWork};

/// Shared storage clients. Only the backend of the active provider needs to be
/// present.
#[derive(Clone, Default)]
pub struct StorageBackends {
    pub relational: Option<SqlitePool>,
    pub document: Option<Arc<dyn DocumentClient>>,
    pub graph: Option<Arc<dyn GraphClient>>,
}

impl StorageBackends {
    pub fn with_relational(mut self, pool: SqlitePool) -> Self {
        self.relational = Some(pool);
        self
    }

    pub fn with_document(mut self, client: Arc<dyn DocumentClient>) -> Self {
        self.document = Some(client);
        self
    }

    pub fn with_graph(mut self, client: Arc<dyn GraphClient>) -> Self {
        self.graph = Some(client);
        self
    }
}

impl core::fmt::Debug for StorageBackends {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StorageBackends")
            .field("relational", &self.relational.is_some())
            .field("document", &self.document.is_some())
            .field("graph", &self.graph.is_some())
            .finish()
    }
}

/// Per-unit-of-work storage state, one variant per provider.
#[derive(Debug, Clone)]
pub enum ProviderSession {
    Relational(Arc<RelationalSession>),
    Document(Arc<ImmediateSession<dyn DocumentClient>>),
    Graph(Arc<ImmediateSession<dyn GraphClient>>),
}

impl ProviderSession {
    pub fn provider(&self) -> Provider {
        match self {
            ProviderSession::Relational(_) => Provider::Relational,
            ProviderSession::Document(_) => Provider::Document,
            ProviderSession::Graph(_) => Provider::Graph,
        }
    }
}

pub(crate) fn build_repository<E: Entity>(
    session: &ProviderSession,
    entry: &RegisteredEntity,
) -> Arc<dyn Repository<E>> {
    let key = entry.storage_key(session.provider()).clone();
    match session {
        ProviderSession::Relational(s) => Arc::new(RelationalRepository::<E>::new(Arc::clone(s), key)),
        ProviderSession::Document(s) => Arc::new(DocumentRepository::<E>::new(Arc::clone(s), key)),
        ProviderSession::Graph(s) => Arc::new(GraphRepository::<E>::new(Arc::clone(s), key)),
    }
}

/// Builds repositories and units of work for any provider × registered type.
#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    registry: Arc<EntityRegistry>,
    backends: StorageBackends,
}

impl RepositoryFactory {
    pub fn new(registry: Arc<EntityRegistry>, backends: StorageBackends) -> Self {
        Self { registry, backends }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Fresh storage session for `provider`.
    pub fn open_session(
        &self,
        provider: Provider,
        cancellation: Cancellation,
    ) -> Result<ProviderSession, ConfigError> {
        let missing = || ConfigError::MissingBackend(provider);
        Ok(match provider {
            Provider::Relational => {
                let pool = self.backends.relational.clone().ok_or_else(missing)?;
                ProviderSession::Relational(Arc::new(RelationalSession::new(pool, cancellation)))
            }
            Provider::Document => {
                let client = self.backends.document.clone().ok_or_else(missing)?;
                ProviderSession::Document(Arc::new(ImmediateSession::new(client, cancellation)))
            }
            Provider::Graph => {
                let client = self.backends.graph.clone().ok_or_else(missing)?;
                ProviderSession::Graph(Arc::new(ImmediateSession::new(client, cancellation)))
            }
        })
    }

    /// Repository for `E` bound to `session`.
    pub fn create_repository<E: Entity>(
        &self,
        session: &ProviderSession,
    ) -> PersistenceResult<Arc<dyn Repository<E>>> {
        let entry = self.registry.entry::<E>()?;
        Ok(build_repository::<E>(session, entry))
    }

    /// New unit of work with one repository per registered entity type.
    #[instrument(skip(self, cancellation), err)]
    pub fn create_unit_of_work(
        &self,
        provider: Provider,
        cancellation: Cancellation,
    ) -> PersistenceResult<StoreUnitOfWork> {
        let session = self.open_session(provider, cancellation.clone())?;
        let mut repositories = RepositorySet::with_capacity(self.registry.len());
        for entry in self.registry.entries() {
            entry.install(&session, &mut repositories);
        }
        debug!(repositories = repositories.len(), "unit of work ready");
        Ok(StoreUnitOfWork::new(session, repositories, cancellation))
    }
}
