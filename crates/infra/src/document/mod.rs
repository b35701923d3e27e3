//! Document provider: one collection per entity type, one document per entity.

mod client;
mod in_memory;
mod repository;

pub use client::{DOCUMENT_ID, Document, DocumentClient, DocumentStoreError};
pub use in_memory::InMemoryDocumentClient;
pub use repository::DocumentRepository;
