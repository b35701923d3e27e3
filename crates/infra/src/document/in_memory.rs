use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use super::client::{Document, DocumentClient, DocumentStoreError, document_id};

type Collection = BTreeMap<String, Document>;

/// In-memory document store.
///
/// Intended for tests/dev. Collections are created on first insert and
/// documents are returned in `_id` order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentClient {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> DocumentStoreError {
        DocumentStoreError::Unavailable("lock poisoned".to_string())
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentClient for InMemoryDocumentClient {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), DocumentStoreError> {
        let id = document_id(&document)?.to_string();
        let mut collections = self.collections.write().map_err(Self::poisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(DocumentStoreError::DuplicateKey {
                collection: collection.to_string(),
                id,
            });
        }
        docs.insert(id, document);
        Ok(())
    }

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError> {
        let collections = self.collections.read().map_err(Self::poisoned)?;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<u64, DocumentStoreError> {
        let mut collections = self.collections.write().map_err(Self::poisoned)?;
        match collections.get_mut(collection).and_then(|docs| docs.get_mut(id)) {
            Some(existing) => {
                *existing = document;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, collection: &str, id: &str) -> Result<u64, DocumentStoreError> {
        let mut collections = self.collections.write().map_err(Self::poisoned)?;
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        Ok(u64::from(removed))
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError> {
        let collections = self.collections.read().map_err(Self::poisoned)?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
