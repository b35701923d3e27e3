//! Document store client seam.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document: field name → JSON value.
pub type Document = Map<String, Value>;

/// Field holding the document identity.
pub const DOCUMENT_ID: &str = "_id";

#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("duplicate key: collection '{collection}' already holds _id {id}")]
    DuplicateKey { collection: String, id: String },

    #[error("document has no string `_id`")]
    MissingId,

    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal collection API the document repository needs.
///
/// Every call is applied and durable on return; there is no session or
/// multi-document transaction.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), DocumentStoreError>;

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentStoreError>;

    /// Whole-document replace; returns how many documents matched (0 or 1).
    async fn replace_one(
        &self,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<u64, DocumentStoreError>;

    /// Returns how many documents were removed (0 or 1).
    async fn delete_one(&self, collection: &str, id: &str) -> Result<u64, DocumentStoreError>;

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, DocumentStoreError>;
}

pub(crate) fn document_id(document: &Document) -> Result<&str, DocumentStoreError> {
    document
        .get(DOCUMENT_ID)
        .and_then(Value::as_str)
        .ok_or(DocumentStoreError::MissingId)
}
