//! Relational provider on SQLite via `sqlx`.
//!
//! - One table per entity type, one column per schema field.
//! - Writes are staged per unit of work and flushed by `save_changes`.
//! - Begin/commit/rollback map to a real database transaction.

mod error;
mod repository;
mod schema;
mod session;

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use polystore_core::{PersistenceError, PersistenceResult, Provider};

pub use repository::RelationalRepository;
pub use schema::ensure_schema;
pub use session::RelationalSession;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Open a pool with foreign keys enforced.
///
/// An in-memory database only lives as long as its connection, so for those
/// URLs the pool is pinned to a single connection that is never recycled.
pub async fn connect(url: &str, max_connections: u32) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| PersistenceError::storage(Provider::Relational, "connect", e))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if is_in_memory(url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(|e| PersistenceError::storage(Provider::Relational, "connect", e))?;

    info!(in_memory = is_in_memory(url), "relational pool ready");
    Ok(pool)
}

pub async fn connect_in_memory() -> PersistenceResult<SqlitePool> {
    connect("sqlite::memory:", 1).await
}
