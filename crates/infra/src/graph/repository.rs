use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use polystore_core::{
    ConstraintKind, Entity, EntityId, EntitySchema, PersistenceError, PersistenceResult, Provider,
    Repository, RoundTrip, StorageKey,
};

use super::client::{GraphClient, GraphStoreError, Properties};
use super::properties::{flatten, unflatten};
use crate::immediate::ImmediateSession;

/// Node-backed repository. Entities are nodes labeled with the storage key.
///
/// Only scalar schema fields are stored; see [`Repository::round_trip`].
pub struct GraphRepository<E> {
    session: Arc<ImmediateSession<dyn GraphClient>>,
    label: StorageKey,
    schema: EntitySchema,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> GraphRepository<E> {
    pub fn new(session: Arc<ImmediateSession<dyn GraphClient>>, label: StorageKey) -> Self {
        Self {
            session,
            label,
            schema: E::schema(),
            _entity: PhantomData,
        }
    }

    fn map_error(&self, operation: &'static str, err: GraphStoreError) -> PersistenceError {
        match err {
            GraphStoreError::ConstraintViolation { .. } => {
                PersistenceError::constraint(ConstraintKind::Unique, self.label.as_str(), err)
            }
            other => PersistenceError::storage(Provider::Graph, operation, other),
        }
    }

    fn to_properties(&self, entity: &E) -> PersistenceResult<Properties> {
        flatten::<E>(&self.schema, &entity.to_record()?)
    }

    fn from_properties(&self, properties: Properties) -> PersistenceResult<E> {
        E::from_record(unflatten(&self.schema, properties))
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for GraphRepository<E> {
    fn provider(&self) -> Provider {
        Provider::Graph
    }

    fn storage_key(&self) -> &StorageKey {
        &self.label
    }

    fn round_trip(&self) -> RoundTrip {
        let dropped_fields = self.schema.non_scalar_fields();
        if dropped_fields.is_empty() {
            RoundTrip::Lossless
        } else {
            RoundTrip::Lossy { dropped_fields }
        }
    }

    #[instrument(skip(self), fields(label = %self.label, id = %id), err)]
    async fn get_by_id(&self, id: EntityId) -> PersistenceResult<Option<E>> {
        let node = self
            .session
            .cancellation()
            .guard("get_by_id", async {
                self.session
                    .client()
                    .find_node(self.label.as_str(), &id.to_canonical())
                    .await
                    .map_err(|e| self.map_error("get_by_id", e))
            })
            .await?;
        node.map(|props| self.from_properties(props)).transpose()
    }

    #[instrument(skip(self, entity), fields(label = %self.label, id = %entity.id()), err)]
    async fn add(&self, entity: &E) -> PersistenceResult<()> {
        let properties = self.to_properties(entity)?;
        self.session
            .cancellation()
            .guard("add", async {
                self.session
                    .client()
                    .create_node(self.label.as_str(), properties)
                    .await
                    .map_err(|e| self.map_error("add", e))
            })
            .await?;
        self.session.record_write(1);
        Ok(())
    }

    #[instrument(skip(self, entity), fields(label = %self.label, id = %entity.id()), err)]
    async fn update(&self, entity: &E) -> PersistenceResult<()> {
        let properties = self.to_properties(entity)?;
        let id = entity.id().to_canonical();
        let matched = self
            .session
            .cancellation()
            .guard("update", async {
                self.session
                    .client()
                    .set_properties(self.label.as_str(), &id, properties)
                    .await
                    .map_err(|e| self.map_error("update", e))
            })
            .await?;
        if matched {
            self.session.record_write(1);
        } else {
            debug!("update of missing node ignored");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(label = %self.label, id = %id), err)]
    async fn delete(&self, id: EntityId) -> PersistenceResult<()> {
        let summary = self
            .session
            .cancellation()
            .guard("delete", async {
                self.session
                    .client()
                    .detach_delete(self.label.as_str(), &id.to_canonical())
                    .await
                    .map_err(|e| self.map_error("delete", e))
            })
            .await?;
        debug!(
            nodes = summary.nodes_deleted,
            relationships = summary.relationships_deleted,
            "detach delete"
        );
        self.session.record_write(summary.nodes_deleted);
        Ok(())
    }

    #[instrument(skip(self), fields(label = %self.label), err)]
    async fn get_all(&self) -> PersistenceResult<Vec<E>> {
        let nodes = self
            .session
            .cancellation()
            .guard("get_all", async {
                self.session
                    .client()
                    .find_nodes(self.label.as_str())
                    .await
                    .map_err(|e| self.map_error("get_all", e))
            })
            .await?;
        nodes.into_iter().map(|props| self.from_properties(props)).collect()
    }
}
