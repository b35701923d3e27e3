#![allow(dead_code)]

use std::sync::Arc;

use polystore_core::Provider;
use polystore_infra::document::InMemoryDocumentClient;
use polystore_infra::graph::InMemoryGraphClient;
use polystore_infra::relational::{connect_in_memory, ensure_schema};
use polystore_infra::{RepositoryFactory, StorageBackends, default_registry};

/// Factory over a fresh, empty backend for `provider`.
pub async fn factory(provider: Provider) -> RepositoryFactory {
    let registry = Arc::new(default_registry().unwrap());
    let backends = match provider {
        Provider::Relational => {
            let pool = connect_in_memory().await.unwrap();
            ensure_schema(&pool, &registry).await.unwrap();
            StorageBackends::default().with_relational(pool)
        }
        Provider::Document => {
            StorageBackends::default().with_document(Arc::new(InMemoryDocumentClient::new()))
        }
        Provider::Graph => StorageBackends::default().with_graph(Arc::new(InMemoryGraphClient::new())),
    };
    RepositoryFactory::new(registry, backends)
}

/// Graph factory that also hands back the client for direct inspection.
pub fn graph_factory() -> (RepositoryFactory, Arc<InMemoryGraphClient>) {
    let client = Arc::new(InMemoryGraphClient::new());
    let factory = RepositoryFactory::new(
        Arc::new(default_registry().unwrap()),
        StorageBackends::default().with_graph(client.clone()),
    );
    (factory, client)
}

pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}
