use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use polystore_core::{Entity, EntityId, PersistenceResult, Provider, Record, Repository, StorageKey};

use super::schema::TableMapping;
use super::session::{PendingChange, PendingOp, RelationalSession};

/// Table-backed repository. Writes are staged on the shared session and only
/// reach the database when the unit of work saves.
pub struct RelationalRepository<E> {
    session: Arc<RelationalSession>,
    mapping: Arc<TableMapping>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> RelationalRepository<E> {
    pub fn new(session: Arc<RelationalSession>, table: StorageKey) -> Self {
        Self {
            session,
            mapping: Arc::new(TableMapping::new::<E>(table)),
            _entity: PhantomData,
        }
    }

    async fn stage(&self, id: EntityId, op: PendingOp) {
        self.session
            .stage(PendingChange {
                mapping: Arc::clone(&self.mapping),
                id,
                op,
            })
            .await;
    }

    /// Serialize and check the record binds against the table before staging,
    /// so a bad entity fails at the call site instead of at save time.
    fn checked_record(&self, entity: &E) -> PersistenceResult<Record> {
        let record = entity.to_record()?;
        self.mapping.encode(&record)?;
        Ok(record)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for RelationalRepository<E> {
    fn provider(&self) -> Provider {
        Provider::Relational
    }

    fn storage_key(&self) -> &StorageKey {
        &self.mapping.table
    }

    #[instrument(skip(self), fields(table = %self.mapping.table, id = %id), err)]
    async fn get_by_id(&self, id: EntityId) -> PersistenceResult<Option<E>> {
        self.session
            .fetch_one(&self.mapping, id)
            .await?
            .map(E::from_record)
            .transpose()
    }

    #[instrument(skip(self, entity), fields(table = %self.mapping.table, id = %entity.id()), err)]
    async fn add(&self, entity: &E) -> PersistenceResult<()> {
        let record = self.checked_record(entity)?;
        self.stage(entity.id(), PendingOp::Insert(record)).await;
        Ok(())
    }

    #[instrument(skip(self, entity), fields(table = %self.mapping.table, id = %entity.id()), err)]
    async fn update(&self, entity: &E) -> PersistenceResult<()> {
        let record = self.checked_record(entity)?;
        self.stage(entity.id(), PendingOp::Update(record)).await;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.mapping.table, id = %id), err)]
    async fn delete(&self, id: EntityId) -> PersistenceResult<()> {
        if self.session.fetch_one(&self.mapping, id).await?.is_none() {
            debug!("delete of missing row ignored");
            return Ok(());
        }
        self.stage(id, PendingOp::Delete).await;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.mapping.table), err)]
    async fn get_all(&self) -> PersistenceResult<Vec<E>> {
        self.session
            .fetch_all(&self.mapping)
            .await?
            .into_iter()
            .map(E::from_record)
            .collect()
    }
}
