//! Property graph client seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Node property value. Graph properties cannot be null or nested.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

pub type Properties = BTreeMap<String, PropertyValue>;

/// Property holding the node identity.
pub const NODE_ID: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub label: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub from: NodeRef,
    pub rel_type: String,
    pub to: NodeRef,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DeleteSummary {
    pub nodes_deleted: u64,
    pub relationships_deleted: u64,
}

#[derive(Debug, Error)]
pub enum GraphStoreError {
    #[error("node {label}({id}) already exists")]
    ConstraintViolation { label: String, id: String },

    #[error("node properties have no string `id`")]
    MissingId,

    #[error("node {0:?} not found")]
    NodeNotFound(NodeRef),

    #[error("graph store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal node/relationship API the graph repository needs.
///
/// The store enforces uniqueness of `(label, id)`. Every call is applied and
/// durable on return.
#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn create_node(&self, label: &str, properties: Properties) -> Result<(), GraphStoreError>;

    /// Replace all properties of a node; returns whether the node exists.
    async fn set_properties(
        &self,
        label: &str,
        id: &str,
        properties: Properties,
    ) -> Result<bool, GraphStoreError>;

    async fn find_node(&self, label: &str, id: &str) -> Result<Option<Properties>, GraphStoreError>;

    async fn find_nodes(&self, label: &str) -> Result<Vec<Properties>, GraphStoreError>;

    /// Remove a node together with every relationship touching it.
    async fn detach_delete(&self, label: &str, id: &str) -> Result<DeleteSummary, GraphStoreError>;

    async fn create_relationship(&self, relationship: Relationship) -> Result<(), GraphStoreError>;

    /// Relationships starting or ending at `node`.
    async fn relationships(&self, node: &NodeRef) -> Result<Vec<Relationship>, GraphStoreError>;
}

pub(crate) fn node_id(properties: &Properties) -> Result<&str, GraphStoreError> {
    match properties.get(NODE_ID) {
        Some(PropertyValue::String(id)) => Ok(id),
        _ => Err(GraphStoreError::MissingId),
    }
}
