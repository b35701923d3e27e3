//! Table mapping: entity schema ↔ SQL statements and column values.

use serde_json::{Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::{debug, instrument};

use polystore_core::{
    ConfigError, Entity, EntitySchema, FieldDef, FieldKind, PersistenceError, PersistenceResult,
    Provider, Record, StorageKey,
};

use super::error::map_sqlx_error;
use crate::registry::{EntityRegistry, RegisteredEntity};

/// Column value ready to be bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

/// How one entity type is laid out in its table.
#[derive(Debug)]
pub(crate) struct TableMapping {
    pub(crate) table: StorageKey,
    pub(crate) entity: &'static str,
    fields: Vec<FieldDef>,
}

impl TableMapping {
    pub(crate) fn new<E: Entity>(table: StorageKey) -> Self {
        Self {
            table,
            entity: core::any::type_name::<E>(),
            fields: E::schema().fields().to_vec(),
        }
    }

    fn table_ident(&self) -> String {
        quote_ident(self.table.as_str())
    }

    fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| quote_ident(f.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn select_by_id_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.column_list(),
            self.table_ident(),
            quote_ident(EntitySchema::ID_FIELD)
        )
    }

    pub(crate) fn select_all_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            self.column_list(),
            self.table_ident(),
            quote_ident(EntitySchema::ID_FIELD)
        )
    }

    pub(crate) fn insert_sql(&self) -> String {
        let placeholders = (1..=self.fields.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_ident(),
            self.column_list(),
            placeholders
        )
    }

    /// Full-row replace; `?1` is the identity, matching `encode` order.
    pub(crate) fn update_sql(&self) -> String {
        let assignments = self
            .fields
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, f)| format!("{} = ?{}", quote_ident(f.name), idx + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = ?1",
            self.table_ident(),
            assignments,
            quote_ident(EntitySchema::ID_FIELD)
        )
    }

    pub(crate) fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = ?1",
            self.table_ident(),
            quote_ident(EntitySchema::ID_FIELD)
        )
    }

    /// Column values in schema order.
    pub(crate) fn encode(&self, record: &Record) -> PersistenceResult<Vec<SqlValue>> {
        self.fields
            .iter()
            .map(|field| {
                encode_value(field, record.get(field.name)).map_err(|message| {
                    PersistenceError::Serialization {
                        entity: self.entity,
                        message,
                    }
                })
            })
            .collect()
    }

    pub(crate) fn decode(&self, row: &SqliteRow) -> PersistenceResult<Record> {
        let mut record = Record::new();
        for field in &self.fields {
            let value = decode_value(row, field).map_err(|e| match e {
                DecodeError::Sql(err) => map_sqlx_error("decode_row", &self.table, err),
                DecodeError::Json(message) => PersistenceError::Serialization {
                    entity: self.entity,
                    message,
                },
            })?;
            record.insert(field.name.to_string(), value);
        }
        Ok(record)
    }
}

pub(crate) fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: Vec<SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Integer(i) => query.bind(i),
            SqlValue::Real(f) => query.bind(f),
            SqlValue::Bool(b) => query.bind(b),
        };
    }
    query
}

fn encode_value(field: &FieldDef, value: Option<&Value>) -> Result<SqlValue, String> {
    let value = match value {
        None | Some(Value::Null) => return Ok(SqlValue::Null),
        Some(v) => v,
    };
    let mismatch = |expected: &str| format!("field `{}` expected {expected}, got {value}", field.name);

    match field.kind {
        FieldKind::Uuid | FieldKind::Text | FieldKind::Timestamp | FieldKind::Reference(_) => value
            .as_str()
            .map(|s| SqlValue::Text(s.to_string()))
            .ok_or_else(|| mismatch("a string")),
        FieldKind::Integer => value
            .as_i64()
            .map(SqlValue::Integer)
            .ok_or_else(|| mismatch("an integer")),
        FieldKind::Real => value
            .as_f64()
            .map(SqlValue::Real)
            .ok_or_else(|| mismatch("a number")),
        FieldKind::Boolean => value
            .as_bool()
            .map(SqlValue::Bool)
            .ok_or_else(|| mismatch("a boolean")),
        FieldKind::List | FieldKind::Nested => Ok(SqlValue::Text(value.to_string())),
    }
}

enum DecodeError {
    Sql(sqlx::Error),
    Json(String),
}

impl From<sqlx::Error> for DecodeError {
    fn from(value: sqlx::Error) -> Self {
        DecodeError::Sql(value)
    }
}

fn decode_value(row: &SqliteRow, field: &FieldDef) -> Result<Value, DecodeError> {
    let name = field.name;
    let value = match field.kind {
        FieldKind::Uuid | FieldKind::Text | FieldKind::Timestamp | FieldKind::Reference(_) => row
            .try_get::<Option<String>, _>(name)?
            .map(Value::String),
        FieldKind::Integer => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
        FieldKind::Real => row
            .try_get::<Option<f64>, _>(name)?
            .and_then(Number::from_f64)
            .map(Value::Number),
        FieldKind::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        FieldKind::List | FieldKind::Nested => match row.try_get::<Option<String>, _>(name)? {
            Some(raw) => Some(
                serde_json::from_str(&raw)
                    .map_err(|e| DecodeError::Json(format!("column `{name}` holds invalid JSON: {e}")))?,
            ),
            None => None,
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Integer => "INTEGER",
        FieldKind::Real => "REAL",
        FieldKind::Boolean => "BOOLEAN",
        FieldKind::Uuid
        | FieldKind::Text
        | FieldKind::Timestamp
        | FieldKind::Reference(_)
        | FieldKind::List
        | FieldKind::Nested => "TEXT",
    }
}

fn create_table_sql(entry: &RegisteredEntity, registry: &EntityRegistry) -> Result<String, ConfigError> {
    let mut columns = Vec::with_capacity(entry.schema().fields().len());
    for field in entry.schema().fields() {
        let mut column = format!("{} {}", quote_ident(field.name), column_type(field.kind));
        if field.name == EntitySchema::ID_FIELD {
            column.push_str(" NOT NULL PRIMARY KEY");
        } else {
            if !field.nullable {
                column.push_str(" NOT NULL");
            }
            if field.unique {
                column.push_str(" UNIQUE");
            }
        }
        if let FieldKind::Reference(target) = field.kind {
            let target_entry = registry
                .resolve_type(target.type_id())
                .ok_or(ConfigError::UnregisteredEntity(target.type_name()))?;
            column.push_str(&format!(
                " REFERENCES {}({})",
                quote_ident(target_entry.keys().table.as_str()),
                quote_ident(EntitySchema::ID_FIELD)
            ));
        }
        columns.push(column);
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(entry.keys().table.as_str()),
        columns.join(", ")
    ))
}

/// Create the table of every registered entity type if it does not exist.
///
/// Bootstrap helper for fresh databases; it never alters existing tables.
#[instrument(skip_all, fields(entities = registry.len()), err)]
pub async fn ensure_schema(pool: &SqlitePool, registry: &EntityRegistry) -> PersistenceResult<()> {
    for entry in registry.entries() {
        let sql = create_table_sql(entry, registry)?;
        debug!(table = %entry.keys().table, "ensuring table");
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| PersistenceError::storage(Provider::Relational, "ensure_schema", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_domain::{Customer, SalesOrder};

    use crate::registry::default_registry;

    #[test]
    fn update_binds_identity_as_first_parameter() {
        let mapping = TableMapping::new::<Customer>(StorageKey::new("customers"));
        assert_eq!(
            mapping.update_sql(),
            "UPDATE \"customers\" SET \"name\" = ?2, \"email\" = ?3, \"active\" = ?4, \"created_at\" = ?5, \"tags\" = ?6 WHERE \"id\" = ?1"
        );
        assert!(mapping.insert_sql().ends_with("VALUES (?1, ?2, ?3, ?4, ?5, ?6)"));
    }

    #[test]
    fn collections_are_encoded_as_json_text() {
        let mapping = TableMapping::new::<Customer>(StorageKey::new("customers"));
        let customer = Customer::new("Ada", "ada@example.com").with_tags(["vip"]);
        let values = mapping.encode(&customer.to_record().unwrap()).unwrap();
        assert_eq!(values[0], SqlValue::Text(customer.id.to_canonical()));
        assert_eq!(values[3], SqlValue::Bool(true));
        assert_eq!(values[5], SqlValue::Text("[\"vip\"]".to_string()));
    }

    #[test]
    fn type_mismatch_is_a_serialization_error() {
        let mapping = TableMapping::new::<Customer>(StorageKey::new("customers"));
        let mut record = Customer::new("Ada", "ada@example.com").to_record().unwrap();
        record.insert("active".to_string(), Value::from("yes"));
        let err = mapping.encode(&record).unwrap_err();
        assert!(matches!(err, PersistenceError::Serialization { .. }));
        assert!(err.to_string().contains("`active`"));
    }

    #[test]
    fn references_become_foreign_keys() {
        let registry = default_registry().unwrap();
        let entry = registry.entry::<SalesOrder>().unwrap();
        let sql = create_table_sql(entry, &registry).unwrap();
        assert!(sql.contains("\"customer_id\" TEXT NOT NULL REFERENCES \"customers\"(\"id\")"));
        assert!(sql.contains("\"shipping_address\" TEXT,") || sql.contains("\"shipping_address\" TEXT)"));
    }

    #[test]
    fn unique_fields_get_unique_constraint() {
        let registry = default_registry().unwrap();
        let entry = registry.entry::<Customer>().unwrap();
        let sql = create_table_sql(entry, &registry).unwrap();
        assert!(sql.contains("\"email\" TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("\"id\" TEXT NOT NULL PRIMARY KEY"));
    }
}
