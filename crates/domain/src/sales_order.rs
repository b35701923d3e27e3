use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use polystore_core::{Entity, EntityId, EntitySchema, ValueObject};

use crate::customer::Customer;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Placed,
    Cancelled,
}

/// One product line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: EntityId,
    pub quantity: i64,
    pub unit_price: f64,
}

impl OrderLine {
    pub fn amount(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

impl ValueObject for OrderLine {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub country: String,
}

impl ValueObject for Address {}

/// Sales order placed by a customer.
///
/// `lines` and `shipping_address` are a collection and a nested object: the
/// graph provider does not store them (they read back empty / `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: EntityId,
    pub customer_id: EntityId,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub total: f64,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
}

impl SalesOrder {
    pub fn new(customer_id: EntityId, lines: Vec<OrderLine>) -> Self {
        let total = lines.iter().map(OrderLine::amount).sum();
        Self {
            id: EntityId::new(),
            customer_id,
            status: OrderStatus::Draft,
            placed_at: Utc::now(),
            total,
            lines,
            shipping_address: None,
        }
    }

    pub fn ship_to(mut self, address: Address) -> Self {
        self.shipping_address = Some(address);
        self
    }
}

impl Entity for SalesOrder {
    fn id(&self) -> EntityId {
        self.id
    }

    fn schema() -> EntitySchema {
        EntitySchema::builder()
            .reference::<Customer>("customer_id")
            .text("status")
            .timestamp("placed_at")
            .real("total")
            .list("lines")
            .nested("shipping_address")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::FieldKind;
    use proptest::prelude::*;

    #[test]
    fn schema_references_customer() {
        let schema = SalesOrder::schema();
        match schema.field("customer_id").unwrap().kind {
            FieldKind::Reference(target) => {
                assert_eq!(target.type_id(), core::any::TypeId::of::<Customer>())
            }
            other => panic!("expected reference, got {other:?}"),
        }
        assert_eq!(schema.non_scalar_fields(), vec!["lines", "shipping_address"]);
    }

    #[test]
    fn status_serializes_as_text() {
        let order = SalesOrder::new(EntityId::new(), vec![]);
        let record = order.to_record().unwrap();
        assert_eq!(record["status"], serde_json::json!("draft"));
    }

    #[test]
    fn nested_fields_default_when_absent() {
        let order = SalesOrder::new(EntityId::new(), vec![]).ship_to(Address {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            country: "US".to_string(),
        });
        let mut record = order.to_record().unwrap();
        record.remove("lines");
        record.remove("shipping_address");

        let restored = SalesOrder::from_record(record).unwrap();
        assert!(restored.lines.is_empty());
        assert_eq!(restored.shipping_address, None);
    }

    proptest! {
        #[test]
        fn total_is_sum_of_line_amounts(
            lines in prop::collection::vec((1i64..100, 1u32..10_000), 0..8)
        ) {
            let lines: Vec<OrderLine> = lines
                .into_iter()
                .map(|(quantity, cents)| OrderLine {
                    product_id: EntityId::new(),
                    quantity,
                    unit_price: cents as f64 / 100.0,
                })
                .collect();
            let expected: f64 = lines.iter().map(|l| l.quantity as f64 * l.unit_price).sum();

            let order = SalesOrder::new(EntityId::new(), lines);
            prop_assert!((order.total - expected).abs() < 1e-9);
        }
    }
}
