//! Unit of work contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancel::Cancellation;
use crate::entity::Entity;
use crate::error::PersistenceResult;
use crate::provider::Provider;
use crate::repository::Repository;

/// Per-operation aggregate of repositories plus save/transaction control.
///
/// A unit of work is created for one logical operation (typically one inbound
/// command) and dropped afterwards. It is never shared between operations.
///
/// ## Transactions
///
/// Only the relational provider gives begin/commit/rollback real meaning. On the
/// document and graph providers the transaction methods succeed without doing
/// anything: each write is already durable, so a failure halfway through a
/// multi-step command leaves the earlier writes applied. Compensating cleanup is
/// the calling command's job.
#[async_trait]
pub trait UnitOfWork: Send {
    fn provider(&self) -> Provider;

    /// Token shared by every repository of this unit of work.
    fn cancellation(&self) -> &Cancellation;

    /// Repository for `E`, or a configuration error naming the unregistered type.
    fn repository<E: Entity>(&self) -> PersistenceResult<Arc<dyn Repository<E>>>;

    /// Flush pending changes; returns the number of affected records.
    async fn save_changes(&mut self) -> PersistenceResult<u64>;

    async fn begin_transaction(&mut self) -> PersistenceResult<()>;

    async fn commit_transaction(&mut self) -> PersistenceResult<()>;

    /// Must still run when the cancellation token has fired.
    async fn rollback_transaction(&mut self) -> PersistenceResult<()>;
}
