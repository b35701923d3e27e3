use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::client::{
    DeleteSummary, GraphClient, GraphStoreError, NodeRef, Properties, Relationship, node_id,
};

#[derive(Debug, Default)]
struct GraphState {
    nodes: BTreeMap<NodeRef, Properties>,
    relationships: Vec<Relationship>,
}

/// In-memory property graph.
///
/// Intended for tests/dev. Enforces the `(label, id)` uniqueness constraint.
#[derive(Debug, Default)]
pub struct InMemoryGraphClient {
    state: RwLock<GraphState>,
}

impl InMemoryGraphClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> GraphStoreError {
        GraphStoreError::Unavailable("lock poisoned".to_string())
    }

    pub fn node_count(&self) -> usize {
        self.state.read().map(|s| s.nodes.len()).unwrap_or(0)
    }

    pub fn relationship_count(&self) -> usize {
        self.state.read().map(|s| s.relationships.len()).unwrap_or(0)
    }
}

#[async_trait]
impl GraphClient for InMemoryGraphClient {
    async fn create_node(&self, label: &str, properties: Properties) -> Result<(), GraphStoreError> {
        let key = NodeRef::new(label, node_id(&properties)?);
        let mut state = self.state.write().map_err(Self::poisoned)?;
        if state.nodes.contains_key(&key) {
            return Err(GraphStoreError::ConstraintViolation {
                label: key.label,
                id: key.id,
            });
        }
        state.nodes.insert(key, properties);
        Ok(())
    }

    async fn set_properties(
        &self,
        label: &str,
        id: &str,
        properties: Properties,
    ) -> Result<bool, GraphStoreError> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        match state.nodes.get_mut(&NodeRef::new(label, id)) {
            Some(existing) => {
                *existing = properties;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_node(&self, label: &str, id: &str) -> Result<Option<Properties>, GraphStoreError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state.nodes.get(&NodeRef::new(label, id)).cloned())
    }

    async fn find_nodes(&self, label: &str) -> Result<Vec<Properties>, GraphStoreError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state
            .nodes
            .iter()
            .filter(|(key, _)| key.label == label)
            .map(|(_, props)| props.clone())
            .collect())
    }

    async fn detach_delete(&self, label: &str, id: &str) -> Result<DeleteSummary, GraphStoreError> {
        let key = NodeRef::new(label, id);
        let mut state = self.state.write().map_err(Self::poisoned)?;
        if state.nodes.remove(&key).is_none() {
            return Ok(DeleteSummary::default());
        }
        let before = state.relationships.len();
        state.relationships.retain(|r| r.from != key && r.to != key);
        Ok(DeleteSummary {
            nodes_deleted: 1,
            relationships_deleted: (before - state.relationships.len()) as u64,
        })
    }

    async fn create_relationship(&self, relationship: Relationship) -> Result<(), GraphStoreError> {
        let mut state = self.state.write().map_err(Self::poisoned)?;
        for end in [&relationship.from, &relationship.to] {
            if !state.nodes.contains_key(end) {
                return Err(GraphStoreError::NodeNotFound(end.clone()));
            }
        }
        state.relationships.push(relationship);
        Ok(())
    }

    async fn relationships(&self, node: &NodeRef) -> Result<Vec<Relationship>, GraphStoreError> {
        let state = self.state.read().map_err(Self::poisoned)?;
        Ok(state
            .relationships
            .iter()
            .filter(|r| &r.from == node || &r.to == node)
            .cloned()
            .collect())
    }
}
