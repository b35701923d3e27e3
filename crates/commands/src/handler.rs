use async_trait::async_trait;

use polystore_core::UnitOfWork;

use crate::Command;

/// Executes one command type against a unit of work.
///
/// The handler gets repositories through `uow.repository::<E>()`; it does not
/// save or commit itself when the command is transactional.
#[async_trait]
pub trait CommandHandler<U: UnitOfWork>: Send + Sync {
    type Cmd: Command;
    type Output: Send;
    type Error: core::fmt::Debug + Send + Sync + 'static;

    async fn handle(&self, command: Self::Cmd, uow: &mut U) -> Result<Self::Output, Self::Error>;
}
