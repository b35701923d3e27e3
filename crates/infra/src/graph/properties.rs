//! Record ↔ node property flattening, driven by the entity schema.
//!
//! Only scalar fields become properties. `List` fields read back as `[]` and
//! `Nested` fields are left out so the entity's serde default applies.

use serde_json::{Number, Value};

use polystore_core::{EntitySchema, FieldKind, PersistenceError, PersistenceResult, Record};

use super::client::{Properties, PropertyValue};

pub(crate) fn flatten<E: ?Sized>(schema: &EntitySchema, record: &Record) -> PersistenceResult<Properties> {
    let mut properties = Properties::new();
    for field in schema.scalar_fields() {
        let value = match record.get(field.name) {
            None | Some(Value::Null) => continue,
            Some(value) => value,
        };
        let property = match field.kind {
            FieldKind::Uuid | FieldKind::Text | FieldKind::Timestamp | FieldKind::Reference(_) => {
                value.as_str().map(|s| PropertyValue::String(s.to_string()))
            }
            FieldKind::Integer => value.as_i64().map(PropertyValue::Integer),
            FieldKind::Real => value.as_f64().map(PropertyValue::Float),
            FieldKind::Boolean => value.as_bool().map(PropertyValue::Boolean),
            FieldKind::List | FieldKind::Nested => None,
        }
        .ok_or_else(|| {
            PersistenceError::serialization::<E>(format!(
                "field `{}` cannot be stored as a {:?} property: {value}",
                field.name, field.kind
            ))
        })?;
        properties.insert(field.name.to_string(), property);
    }
    Ok(properties)
}

pub(crate) fn unflatten(schema: &EntitySchema, mut properties: Properties) -> Record {
    let mut record = Record::new();
    for field in schema.fields() {
        let value = match field.kind {
            FieldKind::List => Value::Array(Vec::new()),
            FieldKind::Nested => continue,
            _ => properties.remove(field.name).map_or(Value::Null, to_json),
        };
        record.insert(field.name.to_string(), value);
    }
    record
}

fn to_json(property: PropertyValue) -> Value {
    match property {
        PropertyValue::String(s) => Value::String(s),
        PropertyValue::Integer(i) => Value::from(i),
        PropertyValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        PropertyValue::Boolean(b) => Value::Bool(b),
    }
}
