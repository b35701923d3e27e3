//! Persistence error model.

use thiserror::Error;

use crate::provider::Provider;

/// Result type used across the persistence layer.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Boxed engine error kept as the `source` of storage failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wiring/configuration failure.
///
/// These are programming or deployment mistakes. They are fatal at the call
/// site and must never be caught-and-ignored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported persistence provider '{0}' (expected relational, document or graph)")]
    UnknownProvider(String),

    #[error("entity type `{0}` is not registered for persistence")]
    UnregisteredEntity(&'static str),

    #[error("entity type `{0}` is registered more than once")]
    DuplicateEntity(&'static str),

    #[error("storage key '{key}' is mapped to more than one entity type for the {provider} provider")]
    DuplicateStorageKey { provider: Provider, key: String },

    #[error("entity type `{entity}` has an empty storage key for the {provider} provider")]
    EmptyStorageKey {
        entity: &'static str,
        provider: Provider,
    },

    #[error("field `{field}` of `{entity}` references unregistered entity type `{target}`")]
    DanglingReference {
        entity: &'static str,
        field: &'static str,
        target: &'static str,
    },

    #[error("no storage backend configured for the {0} provider")]
    MissingBackend(Provider),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Misuse of the transaction surface of a unit of work.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("a transaction is already active on this unit of work")]
    AlreadyActive,

    #[error("no active transaction on this unit of work")]
    NotActive,
}

/// Classification of an engine-reported integrity violation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
}

impl core::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::NotNull => "not-null",
            ConstraintKind::Check => "check",
        };
        f.write_str(s)
    }
}

/// Persistence-level error.
///
/// Engine errors are never flattened into strings: they stay reachable through
/// `source()` (see [`PersistenceError::engine_error`]) so callers can inspect
/// the original failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("{kind} constraint violated on '{storage_key}': {source}")]
    Constraint {
        kind: ConstraintKind,
        storage_key: String,
        #[source]
        source: BoxError,
    },

    #[error("{provider} store failed during {operation}: {source}")]
    Storage {
        provider: Provider,
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("cannot map `{entity}` to a storage record: {message}")]
    Serialization {
        entity: &'static str,
        message: String,
    },

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("operation `{operation}` was cancelled")]
    Cancelled { operation: &'static str },
}

impl PersistenceError {
    pub fn storage(
        provider: Provider,
        operation: &'static str,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Storage {
            provider,
            operation,
            source: source.into(),
        }
    }

    pub fn constraint(
        kind: ConstraintKind,
        storage_key: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Constraint {
            kind,
            storage_key: storage_key.into(),
            source: source.into(),
        }
    }

    pub fn serialization<E: ?Sized>(message: impl Into<String>) -> Self {
        Self::Serialization {
            entity: core::any::type_name::<E>(),
            message: message.into(),
        }
    }

    pub fn unregistered<E: ?Sized>() -> Self {
        Self::Configuration(ConfigError::UnregisteredEntity(core::any::type_name::<E>()))
    }

    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            Self::Constraint { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Downcast the underlying engine error (e.g. `sqlx::Error`).
    pub fn engine_error<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Constraint { source, .. } | Self::Storage { source, .. } => {
                source.downcast_ref::<T>()
            }
            _ => None,
        }
    }
}
