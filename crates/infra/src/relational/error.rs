//! SQLx error mapping.
//!
//! | SQLx error | `ErrorKind` | Result |
//! |---|---|---|
//! | `Database` | `UniqueViolation` | `Constraint { kind: Unique }` |
//! | `Database` | `ForeignKeyViolation` | `Constraint { kind: ForeignKey }` |
//! | `Database` | `NotNullViolation` | `Constraint { kind: NotNull }` |
//! | `Database` | `CheckViolation` | `Constraint { kind: Check }` |
//! | anything else | | `Storage { provider: relational }` |
//!
//! The original `sqlx::Error` is always kept as the error source.

use sqlx::error::ErrorKind;

use polystore_core::{ConstraintKind, PersistenceError, Provider, StorageKey};

pub(crate) fn map_sqlx_error(
    operation: &'static str,
    table: &StorageKey,
    err: sqlx::Error,
) -> PersistenceError {
    let kind = match &err {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
            ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
            ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
            ErrorKind::CheckViolation => Some(ConstraintKind::Check),
            _ => None,
        },
        _ => None,
    };

    match kind {
        Some(kind) => PersistenceError::constraint(kind, table.as_str(), err),
        None => PersistenceError::storage(Provider::Relational, operation, err),
    }
}
