//! Command dispatch: transactional commands go through [`TransactionalBehavior`],
//! everything else runs directly against the unit of work.

use tracing::{Instrument, info_span};

use polystore_core::UnitOfWork;

use crate::behavior::{PipelineError, TransactionalBehavior};
use crate::{Command, CommandHandler};

#[derive(Debug, Default, Clone, Copy)]
pub struct CommandPipeline {
    transactional: TransactionalBehavior,
}

impl CommandPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn dispatch<U, H>(
        &self,
        handler: &H,
        command: H::Cmd,
        uow: &mut U,
    ) -> Result<H::Output, PipelineError<H::Error>>
    where
        U: UnitOfWork,
        H: CommandHandler<U>,
    {
        let span = info_span!(
            "command",
            command = core::any::type_name::<H::Cmd>(),
            provider = %uow.provider(),
            transactional = <H::Cmd as Command>::TRANSACTIONAL,
        );

        async move {
            if <H::Cmd as Command>::TRANSACTIONAL {
                self.transactional.execute(handler, command, uow).await
            } else {
                handler
                    .handle(command, uow)
                    .await
                    .map_err(PipelineError::Command)
            }
        }
        .instrument(span)
        .await
    }
}
