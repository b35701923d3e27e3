use std::sync::Arc;

use tracing::info;

use polystore_core::PersistenceResult;
use polystore_infra::relational::ensure_schema;
use polystore_infra::{PersistenceConfig, RepositoryFactory, default_registry};

/// Connect the configured backend and build the repository factory.
///
/// For the relational provider the tables of every registered entity type are
/// created when missing.
pub async fn bootstrap(config: &PersistenceConfig) -> PersistenceResult<RepositoryFactory> {
    let registry = Arc::new(default_registry()?);
    let backends = config.connect().await?;

    if let Some(pool) = &backends.relational {
        ensure_schema(pool, &registry).await?;
    }

    info!(
        provider = %config.provider,
        entities = registry.len(),
        "persistence ready"
    );
    Ok(RepositoryFactory::new(registry, backends))
}
