//! Entity registry: entity type → storage key per provider.
//!
//! The registry is built once at startup from an explicit list of
//! `register::<E>()` calls. It is keyed by the Rust type itself, so a renamed
//! or removed entity type breaks the build instead of silently resolving to a
//! different table, collection or label.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use polystore_core::{
    ConfigError, Entity, EntitySchema, FieldKind, PersistenceError, PersistenceResult, Provider, StorageKey,
    StorageKeys,
};
use polystore_domain::{Customer, Product, SalesOrder};

use crate::factory::{ProviderSession, build_repository};
use crate::unit_of_work::RepositorySet;

type Installer = fn(&ProviderSession, &RegisteredEntity, &mut RepositorySet);

/// One registered entity type.
pub struct RegisteredEntity {
    type_id: TypeId,
    type_name: &'static str,
    keys: StorageKeys,
    schema: EntitySchema,
    install: Installer,
}

impl RegisteredEntity {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn storage_key(&self, provider: Provider) -> &StorageKey {
        self.keys.for_provider(provider)
    }

    /// Build this type's repository for `session` and put it into `set`.
    pub(crate) fn install(&self, session: &ProviderSession, set: &mut RepositorySet) {
        (self.install)(session, self, set)
    }
}

impl core::fmt::Debug for RegisteredEntity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisteredEntity")
            .field("type_name", &self.type_name)
            .field("keys", &self.keys)
            .finish()
    }
}

fn install<E: Entity>(session: &ProviderSession, entry: &RegisteredEntity, set: &mut RepositorySet) {
    set.insert::<E>(build_repository::<E>(session, entry));
}

/// Immutable type → storage-key table.
#[derive(Debug)]
pub struct EntityRegistry {
    entries: Vec<RegisteredEntity>,
    by_type: HashMap<TypeId, usize>,
}

impl EntityRegistry {
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::default()
    }

    /// Storage key of `E` for `provider`.
    pub fn resolve<E: Entity>(&self, provider: Provider) -> PersistenceResult<&StorageKey> {
        Ok(self.entry::<E>()?.storage_key(provider))
    }

    pub fn entry<E: Entity>(&self) -> PersistenceResult<&RegisteredEntity> {
        self.resolve_type(TypeId::of::<E>())
            .ok_or_else(PersistenceError::unregistered::<E>)
    }

    pub fn resolve_type(&self, type_id: TypeId) -> Option<&RegisteredEntity> {
        self.by_type.get(&type_id).map(|&idx| &self.entries[idx])
    }

    pub fn is_registered<E: Entity>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<E>())
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[RegisteredEntity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    entries: Vec<RegisteredEntity>,
}

impl EntityRegistryBuilder {
    pub fn register<E: Entity>(mut self, keys: StorageKeys) -> Self {
        self.entries.push(RegisteredEntity {
            type_id: TypeId::of::<E>(),
            type_name: core::any::type_name::<E>(),
            keys,
            schema: E::schema(),
            install: install::<E>,
        });
        self
    }

    /// Validate and freeze the table.
    ///
    /// Rejects duplicate registrations, blank keys, two types sharing a key
    /// on the same provider and references to unregistered types.
    pub fn build(self) -> Result<EntityRegistry, ConfigError> {
        let mut by_type = HashMap::with_capacity(self.entries.len());
        let mut seen_keys: HashSet<(Provider, String)> = HashSet::new();

        for (idx, entry) in self.entries.iter().enumerate() {
            if by_type.insert(entry.type_id, idx).is_some() {
                return Err(ConfigError::DuplicateEntity(entry.type_name));
            }
            for provider in Provider::ALL {
                let key = entry.storage_key(provider);
                if key.is_empty() {
                    return Err(ConfigError::EmptyStorageKey {
                        entity: entry.type_name,
                        provider,
                    });
                }
                if !seen_keys.insert((provider, key.as_str().to_string())) {
                    return Err(ConfigError::DuplicateStorageKey {
                        provider,
                        key: key.as_str().to_string(),
                    });
                }
            }
        }

        for entry in &self.entries {
            for field in entry.schema.fields() {
                if let FieldKind::Reference(target) = field.kind {
                    if !by_type.contains_key(&target.type_id()) {
                        return Err(ConfigError::DanglingReference {
                            entity: entry.type_name,
                            field: field.name,
                            target: target.type_name(),
                        });
                    }
                }
            }
        }

        Ok(EntityRegistry {
            entries: self.entries,
            by_type,
        })
    }
}

/// The storage-key table for the shipped entity catalog.
///
/// Every entity type persisted by the application must appear here.
pub fn default_registry() -> Result<EntityRegistry, ConfigError> {
    EntityRegistry::builder()
        .register::<Customer>(StorageKeys::new("customers", "customers", "Customer"))
        .register::<Product>(StorageKeys::new("products", "products", "Product"))
        .register::<SalesOrder>(StorageKeys::new("sales_orders", "salesOrders", "SalesOrder"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    use polystore_core::EntityId;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Unregistered {
        id: EntityId,
    }

    impl Entity for Unregistered {
        fn id(&self) -> EntityId {
            self.id
        }

        fn schema() -> EntitySchema {
            EntitySchema::builder().build()
        }
    }

    #[test]
    fn resolves_each_provider_key() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.resolve::<Customer>(Provider::Relational).unwrap().as_str(), "customers");
        assert_eq!(registry.resolve::<SalesOrder>(Provider::Document).unwrap().as_str(), "salesOrders");
        assert_eq!(registry.resolve::<Product>(Provider::Graph).unwrap().as_str(), "Product");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unregistered_type_fails_loudly() {
        let registry = default_registry().unwrap();
        let err = registry.resolve::<Unregistered>(Provider::Document).unwrap_err();
        match err {
            PersistenceError::Configuration(ConfigError::UnregisteredEntity(name)) => {
                assert!(name.ends_with("Unregistered"))
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert!(!registry.is_registered::<Unregistered>());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = EntityRegistry::builder()
            .register::<Customer>(StorageKeys::new("a", "a", "A"))
            .register::<Customer>(StorageKeys::new("b", "b", "B"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntity(name) if name.ends_with("Customer")));
    }

    #[test]
    fn shared_storage_key_is_rejected() {
        let err = EntityRegistry::builder()
            .register::<Customer>(StorageKeys::new("things", "customers", "Customer"))
            .register::<Product>(StorageKeys::new("things", "products", "Product"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateStorageKey {
                provider: Provider::Relational,
                key: "things".to_string()
            }
        );
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = EntityRegistry::builder()
            .register::<Customer>(StorageKeys::new("customers", "", "Customer"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyStorageKey { provider: Provider::Document, .. }
        ));
    }

    #[test]
    fn reference_to_unregistered_type_is_rejected() {
        let err = EntityRegistry::builder()
            .register::<SalesOrder>(StorageKeys::new("sales_orders", "salesOrders", "SalesOrder"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DanglingReference { field: "customer_id", target, .. } if target.ends_with("Customer")
        ));
    }

    #[test]
    fn reference_may_precede_its_target() {
        let registry = EntityRegistry::builder()
            .register::<SalesOrder>(StorageKeys::new("sales_orders", "salesOrders", "SalesOrder"))
            .register::<Customer>(StorageKeys::new("customers", "customers", "Customer"))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reference_targets_resolve_by_type() {
        let registry = default_registry().unwrap();
        let target = registry.resolve_type(TypeId::of::<Customer>()).unwrap();
        assert_eq!(target.keys().table.as_str(), "customers");
    }
}
