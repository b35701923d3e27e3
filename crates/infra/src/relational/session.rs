//! Relational session: staged changes plus the (optional) open transaction.
//!
//! One session backs one unit of work. Every repository of that unit of work
//! shares it, so reads see the same transaction and the same staged changes.

use std::sync::Arc;

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use polystore_core::{
    Cancellation, EntityId, PersistenceError, PersistenceResult, Provider, Record, TransactionError,
};

use super::error::map_sqlx_error;
use super::schema::{SqlValue, TableMapping, bind_values};

#[derive(Debug, Clone)]
pub(crate) enum PendingOp {
    Insert(Record),
    Update(Record),
    Delete,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingChange {
    pub(crate) mapping: Arc<TableMapping>,
    pub(crate) id: EntityId,
    pub(crate) op: PendingOp,
}

impl PendingChange {
    fn targets(&self, mapping: &TableMapping, id: EntityId) -> bool {
        self.id == id && self.mapping.table == mapping.table
    }

    fn operation(&self) -> &'static str {
        match self.op {
            PendingOp::Insert(_) => "insert",
            PendingOp::Update(_) => "update",
            PendingOp::Delete => "delete",
        }
    }
}

/// What the staged changes for one row say about it.
#[derive(Debug)]
enum Overlay {
    /// Nothing staged; the stored row decides.
    Stored,
    /// Replaces the stored row, if there is one.
    Replaced(Record),
    /// Decided by an insert or delete.
    Known(Option<Record>),
}

impl Overlay {
    fn of(pending: &[PendingChange], mapping: &TableMapping, id: EntityId) -> Self {
        pending
            .iter()
            .filter(|c| c.targets(mapping, id))
            .fold(Overlay::Stored, |overlay, change| match (&change.op, overlay) {
                (PendingOp::Insert(record), _) => Overlay::Known(Some(record.clone())),
                (PendingOp::Delete, _) => Overlay::Known(None),
                (PendingOp::Update(_), Overlay::Known(None)) => Overlay::Known(None),
                (PendingOp::Update(record), Overlay::Known(Some(_))) => {
                    Overlay::Known(Some(record.clone()))
                }
                (PendingOp::Update(record), Overlay::Stored | Overlay::Replaced(_)) => {
                    Overlay::Replaced(record.clone())
                }
            })
    }
}

#[derive(Default)]
struct SessionState {
    tx: Option<Transaction<'static, Sqlite>>,
    pending: Vec<PendingChange>,
}

impl core::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionState")
            .field("in_transaction", &self.tx.is_some())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Shared state of one relational unit of work.
#[derive(Debug)]
pub struct RelationalSession {
    pool: SqlitePool,
    state: Mutex<SessionState>,
    cancel: Cancellation,
}

impl RelationalSession {
    pub fn new(pool: SqlitePool, cancel: Cancellation) -> Self {
        Self {
            pool,
            state: Mutex::new(SessionState::default()),
            cancel,
        }
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    pub async fn in_transaction(&self) -> bool {
        self.state.lock().await.tx.is_some()
    }

    pub async fn pending_changes(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Latest staged version of the row, else the stored row.
    ///
    /// A staged update only shows when the row it targets exists, either
    /// stored or staged as an insert, matching what a save would leave.
    pub(crate) async fn fetch_one(
        &self,
        mapping: &TableMapping,
        id: EntityId,
    ) -> PersistenceResult<Option<Record>> {
        self.cancel
            .guard("get_by_id", async {
                let mut state = self.state.lock().await;
                let overlay = Overlay::of(&state.pending, mapping, id);
                if let Overlay::Known(record) = overlay {
                    return Ok(record);
                }

                let sql = mapping.select_by_id_sql();
                let query = sqlx::query(&sql).bind(id.to_canonical());
                let row = match state.tx.as_mut() {
                    Some(tx) => query.fetch_optional(&mut **tx).await,
                    None => query.fetch_optional(&self.pool).await,
                }
                .map_err(|e| map_sqlx_error("get_by_id", &mapping.table, e))?;

                match overlay {
                    Overlay::Replaced(record) => Ok(row.map(|_| record)),
                    _ => row.map(|row| mapping.decode(&row)).transpose(),
                }
            })
            .await
    }

    /// Stored rows only; staged changes are not merged in.
    pub(crate) async fn fetch_all(&self, mapping: &TableMapping) -> PersistenceResult<Vec<Record>> {
        self.cancel
            .guard("get_all", async {
                let mut state = self.state.lock().await;
                let sql = mapping.select_all_sql();
                let query = sqlx::query(&sql);
                let rows = match state.tx.as_mut() {
                    Some(tx) => query.fetch_all(&mut **tx).await,
                    None => query.fetch_all(&self.pool).await,
                }
                .map_err(|e| map_sqlx_error("get_all", &mapping.table, e))?;

                rows.iter().map(|row| mapping.decode(row)).collect()
            })
            .await
    }

    pub(crate) async fn stage(&self, change: PendingChange) {
        debug!(
            table = %change.mapping.table,
            id = %change.id,
            operation = change.operation(),
            "staged change"
        );
        self.state.lock().await.pending.push(change);
    }

    /// Flush staged changes; returns the total number of rows affected.
    ///
    /// Runs inside the open transaction, or inside its own one when none is
    /// open. On failure the staged changes are kept.
    #[instrument(skip(self), err)]
    pub(crate) async fn save_changes(&self) -> PersistenceResult<u64> {
        self.cancel
            .guard("save_changes", async {
                let mut guard = self.state.lock().await;
                let SessionState { tx, pending } = &mut *guard;
                if pending.is_empty() {
                    return Ok(0);
                }

                let affected = match tx.as_mut() {
                    Some(tx) => apply(&mut **tx, pending).await?,
                    None => {
                        let mut tx = self.pool.begin().await.map_err(|e| {
                            PersistenceError::storage(Provider::Relational, "save_changes", e)
                        })?;
                        let affected = apply(&mut *tx, pending).await?;
                        tx.commit().await.map_err(|e| {
                            PersistenceError::storage(Provider::Relational, "save_changes", e)
                        })?;
                        affected
                    }
                };

                debug!(changes = pending.len(), affected, "flushed staged changes");
                pending.clear();
                Ok(affected)
            })
            .await
    }

    #[instrument(skip(self), err)]
    pub(crate) async fn begin(&self) -> PersistenceResult<()> {
        self.cancel
            .guard("begin_transaction", async {
                let mut state = self.state.lock().await;
                if state.tx.is_some() {
                    return Err(TransactionError::AlreadyActive.into());
                }
                let tx = self.pool.begin().await.map_err(|e| {
                    PersistenceError::storage(Provider::Relational, "begin_transaction", e)
                })?;
                state.tx = Some(tx);
                Ok(())
            })
            .await
    }

    #[instrument(skip(self), err)]
    pub(crate) async fn commit(&self) -> PersistenceResult<()> {
        self.cancel
            .guard("commit_transaction", async {
                let mut state = self.state.lock().await;
                let tx = state.tx.take().ok_or(TransactionError::NotActive)?;
                if !state.pending.is_empty() {
                    warn!(
                        pending = state.pending.len(),
                        "committing with unsaved staged changes; they stay staged"
                    );
                }
                tx.commit().await.map_err(|e| {
                    PersistenceError::storage(Provider::Relational, "commit_transaction", e)
                })
            })
            .await
    }

    /// Discard staged changes and the open transaction, if any.
    ///
    /// Not subject to cancellation.
    #[instrument(skip(self), err)]
    pub(crate) async fn rollback(&self) -> PersistenceResult<()> {
        let mut state = self.state.lock().await;
        let discarded = state.pending.len();
        state.pending.clear();
        if discarded > 0 {
            debug!(discarded, "discarded staged changes");
        }
        match state.tx.take() {
            Some(tx) => tx.rollback().await.map_err(|e| {
                PersistenceError::storage(Provider::Relational, "rollback_transaction", e)
            }),
            None => Ok(()),
        }
    }
}

async fn apply(conn: &mut SqliteConnection, pending: &[PendingChange]) -> PersistenceResult<u64> {
    let mut affected = 0;
    for change in pending {
        let mapping = &change.mapping;
        let (sql, values) = match &change.op {
            PendingOp::Insert(record) => (mapping.insert_sql(), mapping.encode(record)?),
            PendingOp::Update(record) => (mapping.update_sql(), mapping.encode(record)?),
            PendingOp::Delete => (
                mapping.delete_sql(),
                vec![SqlValue::Text(change.id.to_canonical())],
            ),
        };
        let result = bind_values(sqlx::query(&sql), values)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error(change.operation(), &mapping.table, e))?;
        affected += result.rows_affected();
    }
    Ok(affected)
}
