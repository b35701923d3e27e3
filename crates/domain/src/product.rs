use serde::{Deserialize, Serialize};

use polystore_core::{Entity, EntityId, EntitySchema};

/// A sellable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub sku: String,
    pub name: String,
    pub unit_price: f64,
    pub stock: i64,
    pub discontinued: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, unit_price: f64) -> Self {
        Self {
            id: EntityId::new(),
            sku: sku.into(),
            name: name.into(),
            unit_price,
            stock: 0,
            discontinued: false,
            description: None,
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }
}

impl Entity for Product {
    fn id(&self) -> EntityId {
        self.id
    }

    fn schema() -> EntitySchema {
        EntitySchema::builder()
            .text("sku")
            .unique()
            .text("name")
            .real("unit_price")
            .integer("stock")
            .boolean("discontinued")
            .text("description")
            .nullable()
            .build()
    }
}
