use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use polystore_core::{Entity, EntityId, EntitySchema};

/// A party that places sales orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Free-form labels. Not stored by the graph provider.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            email: email.into(),
            active: true,
            created_at: Utc::now(),
            tags: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl Entity for Customer {
    fn id(&self) -> EntityId {
        self.id
    }

    fn schema() -> EntitySchema {
        EntitySchema::builder()
            .text("name")
            .text("email")
            .unique()
            .boolean("active")
            .timestamp("created_at")
            .list("tags")
            .build()
    }
}
