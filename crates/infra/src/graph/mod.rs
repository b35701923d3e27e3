//! Graph provider: entities as labeled nodes with flattened scalar properties.

mod client;
mod in_memory;
mod properties;
mod repository;

pub use client::{
    DeleteSummary, GraphClient, GraphStoreError, NODE_ID, NodeRef, Properties, PropertyValue,
    Relationship,
};
pub use in_memory::InMemoryGraphClient;
pub use repository::GraphRepository;
