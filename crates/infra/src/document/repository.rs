use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use polystore_core::{
    ConstraintKind, Entity, EntityId, EntitySchema, PersistenceError, PersistenceResult, Provider,
    Record, Repository, StorageKey,
};

use super::client::{DOCUMENT_ID, Document, DocumentClient, DocumentStoreError};
use crate::immediate::ImmediateSession;

/// Collection-backed repository; every call is durable on return.
pub struct DocumentRepository<E> {
    session: Arc<ImmediateSession<dyn DocumentClient>>,
    collection: StorageKey,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> DocumentRepository<E> {
    pub fn new(session: Arc<ImmediateSession<dyn DocumentClient>>, collection: StorageKey) -> Self {
        Self {
            session,
            collection,
            _entity: PhantomData,
        }
    }

    fn map_error(&self, operation: &'static str, err: DocumentStoreError) -> PersistenceError {
        match err {
            DocumentStoreError::DuplicateKey { .. } => {
                PersistenceError::constraint(ConstraintKind::Unique, self.collection.as_str(), err)
            }
            other => PersistenceError::storage(Provider::Document, operation, other),
        }
    }

    fn to_document(entity: &E) -> PersistenceResult<Document> {
        let mut record = entity.to_record()?;
        let id = record
            .remove(EntitySchema::ID_FIELD)
            .unwrap_or_else(|| Value::String(entity.id().to_canonical()));
        let mut document = Document::new();
        document.insert(DOCUMENT_ID.to_string(), id);
        document.extend(record);
        Ok(document)
    }

    fn from_document(mut document: Document) -> PersistenceResult<E> {
        let id = document
            .remove(DOCUMENT_ID)
            .ok_or_else(|| PersistenceError::serialization::<E>("document has no `_id`"))?;
        let mut record = Record::new();
        record.insert(EntitySchema::ID_FIELD.to_string(), id);
        record.extend(document);
        E::from_record(record)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for DocumentRepository<E> {
    fn provider(&self) -> Provider {
        Provider::Document
    }

    fn storage_key(&self) -> &StorageKey {
        &self.collection
    }

    #[instrument(skip(self), fields(collection = %self.collection, id = %id), err)]
    async fn get_by_id(&self, id: EntityId) -> PersistenceResult<Option<E>> {
        let found = self
            .session
            .cancellation()
            .guard("get_by_id", async {
                self.session
                    .client()
                    .find_one(self.collection.as_str(), &id.to_canonical())
                    .await
                    .map_err(|e| self.map_error("get_by_id", e))
            })
            .await?;
        found.map(Self::from_document).transpose()
    }

    #[instrument(skip(self, entity), fields(collection = %self.collection, id = %entity.id()), err)]
    async fn add(&self, entity: &E) -> PersistenceResult<()> {
        let document = Self::to_document(entity)?;
        self.session
            .cancellation()
            .guard("add", async {
                self.session
                    .client()
                    .insert_one(self.collection.as_str(), document)
                    .await
                    .map_err(|e| self.map_error("add", e))
            })
            .await?;
        self.session.record_write(1);
        Ok(())
    }

    #[instrument(skip(self, entity), fields(collection = %self.collection, id = %entity.id()), err)]
    async fn update(&self, entity: &E) -> PersistenceResult<()> {
        let document = Self::to_document(entity)?;
        let id = entity.id().to_canonical();
        let matched = self
            .session
            .cancellation()
            .guard("update", async {
                self.session
                    .client()
                    .replace_one(self.collection.as_str(), &id, document)
                    .await
                    .map_err(|e| self.map_error("update", e))
            })
            .await?;
        if matched == 0 {
            debug!("update of missing document ignored");
        }
        self.session.record_write(matched);
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %self.collection, id = %id), err)]
    async fn delete(&self, id: EntityId) -> PersistenceResult<()> {
        let removed = self
            .session
            .cancellation()
            .guard("delete", async {
                self.session
                    .client()
                    .delete_one(self.collection.as_str(), &id.to_canonical())
                    .await
                    .map_err(|e| self.map_error("delete", e))
            })
            .await?;
        if removed == 0 {
            debug!("delete of missing document ignored");
        }
        self.session.record_write(removed);
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %self.collection), err)]
    async fn get_all(&self) -> PersistenceResult<Vec<E>> {
        let documents = self
            .session
            .cancellation()
            .guard("get_all", async {
                self.session
                    .client()
                    .find_all(self.collection.as_str())
                    .await
                    .map_err(|e| self.map_error("get_all", e))
            })
            .await?;
        documents.into_iter().map(Self::from_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::Cancellation;
    use polystore_domain::{Address, OrderLine, SalesOrder};

    use crate::document::InMemoryDocumentClient;

    fn session() -> (Arc<InMemoryDocumentClient>, Arc<ImmediateSession<dyn DocumentClient>>) {
        let client = Arc::new(InMemoryDocumentClient::new());
        let shared: Arc<dyn DocumentClient> = client.clone();
        (client, Arc::new(ImmediateSession::new(shared, Cancellation::none())))
    }

    #[tokio::test]
    async fn identity_is_stored_under_underscore_id() {
        let (client, session) = session();
        let repo: DocumentRepository<SalesOrder> =
            DocumentRepository::new(session, StorageKey::new("salesOrders"));
        let order = SalesOrder::new(EntityId::new(), Vec::new());
        repo.add(&order).await.unwrap();

        let raw = client
            .find_one("salesOrders", &order.id.to_canonical())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw.get(DOCUMENT_ID), Some(&Value::String(order.id.to_canonical())));
        assert!(!raw.contains_key("id"));
    }

    #[tokio::test]
    async fn nested_values_round_trip() {
        let (_, session) = session();
        let repo: DocumentRepository<SalesOrder> =
            DocumentRepository::new(session, StorageKey::new("salesOrders"));
        let order = SalesOrder::new(
            EntityId::new(),
            vec![OrderLine {
                product_id: EntityId::new(),
                quantity: 2,
                unit_price: 4.5,
            }],
        )
        .ship_to(Address {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            country: "US".into(),
        });
        repo.add(&order).await.unwrap();

        assert!(repo.round_trip().is_lossless());
        assert_eq!(repo.get_by_id(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn writes_are_counted() {
        let (_, session) = session();
        let repo: DocumentRepository<SalesOrder> =
            DocumentRepository::new(Arc::clone(&session), StorageKey::new("salesOrders"));
        let order = SalesOrder::new(EntityId::new(), Vec::new());
        repo.add(&order).await.unwrap();
        repo.update(&order).await.unwrap();
        repo.delete(order.id).await.unwrap();
        repo.delete(order.id).await.unwrap();
        assert_eq!(session.take_writes(), 3);
    }

    #[tokio::test]
    async fn duplicate_add_is_unique_violation() {
        let (_, session) = session();
        let repo: DocumentRepository<SalesOrder> =
            DocumentRepository::new(session, StorageKey::new("salesOrders"));
        let order = SalesOrder::new(EntityId::new(), Vec::new());
        repo.add(&order).await.unwrap();
        let err = repo.add(&order).await.unwrap_err();
        assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
        assert!(err.engine_error::<DocumentStoreError>().is_some());
    }
}
