//! Storage keys: table / collection / label names.

use crate::provider::Provider;

/// Provider-specific name an entity type is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl core::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One storage key per provider for a single entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub table: StorageKey,
    pub collection: StorageKey,
    pub label: StorageKey,
}

impl StorageKeys {
    pub fn new(
        table: impl Into<String>,
        collection: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            table: StorageKey::new(table),
            collection: StorageKey::new(collection),
            label: StorageKey::new(label),
        }
    }

    pub fn for_provider(&self, provider: Provider) -> &StorageKey {
        match provider {
            Provider::Relational => &self.table,
            Provider::Document => &self.collection,
            Provider::Graph => &self.label,
        }
    }
}
