//! Entity trait and the explicit per-entity storage schema.
//!
//! Entities are opaque to the persistence core except for their identity and
//! the schema they declare. The schema is the single source of truth for how a
//! serialized entity maps to columns, document fields and node properties.

use core::any::TypeId;
use core::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{PersistenceError, PersistenceResult};
use crate::id::EntityId;

/// Serialized entity: field name → JSON value.
pub type Record = Map<String, Value>;

/// Entity marker + minimal interface.
///
/// Every type that participates in persistence implements this trait and is
/// registered once in the entity registry.
pub trait Entity: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Returns the entity identifier.
    fn id(&self) -> EntityId;

    /// Declared storage contract (field names and kinds).
    ///
    /// The first field is always the identity field `id`. Fields of kind
    /// [`FieldKind::List`] or [`FieldKind::Nested`] are not persisted by the
    /// graph provider; `Nested` fields must therefore carry a serde default.
    fn schema() -> EntitySchema;

    /// Serialize into a record. The identity must serialize under `id`.
    fn to_record(&self) -> PersistenceResult<Record> {
        match serde_json::to_value(self) {
            Ok(Value::Object(record)) if record.contains_key(EntitySchema::ID_FIELD) => Ok(record),
            Ok(Value::Object(_)) => Err(PersistenceError::serialization::<Self>(
                "serialized entity has no `id` field",
            )),
            Ok(other) => Err(PersistenceError::serialization::<Self>(format!(
                "entity must serialize to an object, got {other}"
            ))),
            Err(e) => Err(PersistenceError::serialization::<Self>(e.to_string())),
        }
    }

    /// Rebuild an entity from a record produced by a storage adapter.
    fn from_record(record: Record) -> PersistenceResult<Self> {
        serde_json::from_value(Value::Object(record))
            .map_err(|e| PersistenceError::serialization::<Self>(e.to_string()))
    }
}

/// Typed pointer to another entity type (used for foreign keys).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntityRef {
    type_id: TypeId,
    type_name: &'static str,
}

impl EntityRef {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: core::any::type_name::<E>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Storage kind of a single entity field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Uuid,
    Text,
    Integer,
    Real,
    Boolean,
    /// RFC 3339 timestamp.
    Timestamp,
    /// UUID of another registered entity.
    Reference(EntityRef),
    /// Collection-typed field (stored as JSON in relational, dropped in graph).
    List,
    /// Nested object (stored as JSON in relational, dropped in graph).
    Nested,
}

impl FieldKind {
    /// Scalars survive every provider unchanged.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldKind::List | FieldKind::Nested)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
}

/// Ordered field list of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    fields: Vec<FieldDef>,
}

impl EntitySchema {
    pub const ID_FIELD: &'static str = "id";

    /// Start a schema; the identity field is added automatically.
    pub fn builder() -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            fields: vec![FieldDef {
                name: Self::ID_FIELD,
                kind: FieldKind::Uuid,
                nullable: false,
                unique: true,
            }],
        }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn scalar_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.kind.is_scalar())
    }

    /// Names of the fields a graph node cannot hold.
    pub fn non_scalar_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| !f.kind.is_scalar())
            .map(|f| f.name)
            .collect()
    }
}

/// Builder for [`EntitySchema`]. Modifiers apply to the most recently added field.
#[derive(Debug, Clone)]
pub struct EntitySchemaBuilder {
    fields: Vec<FieldDef>,
}

impl EntitySchemaBuilder {
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name,
            kind,
            nullable: false,
            unique: false,
        });
        self
    }

    pub fn uuid(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Uuid)
    }

    pub fn text(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Text)
    }

    pub fn integer(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Integer)
    }

    pub fn real(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Real)
    }

    pub fn boolean(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Boolean)
    }

    pub fn timestamp(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Timestamp)
    }

    pub fn reference<E: Entity>(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Reference(EntityRef::of::<E>()))
    }

    pub fn list(self, name: &'static str) -> Self {
        self.field(name, FieldKind::List)
    }

    /// Nested objects are always nullable.
    pub fn nested(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Nested).nullable()
    }

    pub fn nullable(mut self) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.nullable = true;
        }
        self
    }

    pub fn unique(mut self) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.unique = true;
        }
        self
    }

    pub fn build(self) -> EntitySchema {
        EntitySchema {
            fields: self.fields,
        }
    }
}
