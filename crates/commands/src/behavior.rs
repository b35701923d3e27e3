//! Transactional wrapper around command execution.
//!
//! ```text
//! begin ─► handle ─► save_changes ─► commit        (success)
//!            │            │            │
//!            └────────────┴────────────┴─► rollback (failure or cancellation)
//! ```
//!
//! Rollback only follows a successful begin: when begin fails, or cancellation
//! is already requested, nothing was opened here and the unit of work is left
//! as the caller had it. Once begun, exactly one of commit or rollback
//! completes. A handler error is returned as `PipelineError::Command`
//! unchanged; a failing rollback is reported together with the failure that
//! triggered it.

use thiserror::Error;
use tracing::{debug, warn};

use polystore_core::{Cancellation, PersistenceError, UnitOfWork};

use crate::CommandHandler;

#[derive(Debug, Error)]
pub enum PipelineError<E: core::fmt::Debug + 'static> {
    /// The handler's own error.
    #[error("command failed: {0:?}")]
    Command(E),

    /// Begin, save or commit failed.
    #[error(transparent)]
    Persistence(PersistenceError),

    #[error("command was cancelled")]
    Cancelled,

    #[error("rollback failed: {rollback}")]
    RollbackFailed {
        cause: Box<PipelineError<E>>,
        #[source]
        rollback: PersistenceError,
    },
}

impl<E: core::fmt::Debug + 'static> PipelineError<E> {
    fn persistence(err: PersistenceError) -> Self {
        if err.is_cancelled() {
            PipelineError::Cancelled
        } else {
            PipelineError::Persistence(err)
        }
    }

    /// The handler error, also when it is wrapped by a failed rollback.
    pub fn command_error(&self) -> Option<&E> {
        match self {
            PipelineError::Command(e) => Some(e),
            PipelineError::RollbackFailed { cause, .. } => cause.command_error(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            PipelineError::Cancelled => true,
            PipelineError::RollbackFailed { cause, .. } => cause.is_cancelled(),
            _ => false,
        }
    }
}

/// Begin/save/commit bracket with rollback on failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionalBehavior;

impl TransactionalBehavior {
    pub async fn execute<U, H>(
        &self,
        handler: &H,
        command: H::Cmd,
        uow: &mut U,
    ) -> Result<H::Output, PipelineError<H::Error>>
    where
        U: UnitOfWork,
        H: CommandHandler<U>,
    {
        let cancel = uow.cancellation().clone();
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        uow.begin_transaction()
            .await
            .map_err(PipelineError::persistence)?;

        match Self::run(handler, command, uow, &cancel).await {
            Ok(output) => {
                debug!("transaction committed");
                Ok(output)
            }
            Err(cause) => {
                warn!(error = %cause, "rolling back transaction");
                match uow.rollback_transaction().await {
                    Ok(()) => Err(cause),
                    Err(rollback) => Err(PipelineError::RollbackFailed {
                        cause: Box::new(cause),
                        rollback,
                    }),
                }
            }
        }
    }

    /// Body, save and commit of an already begun transaction.
    async fn run<U, H>(
        handler: &H,
        command: H::Cmd,
        uow: &mut U,
        cancel: &Cancellation,
    ) -> Result<H::Output, PipelineError<H::Error>>
    where
        U: UnitOfWork,
        H: CommandHandler<U>,
    {
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = handler.handle(command, uow) => result.map_err(PipelineError::Command),
        }?;

        let affected = uow.save_changes().await.map_err(PipelineError::persistence)?;
        debug!(affected, "changes saved");

        uow.commit_transaction()
            .await
            .map_err(PipelineError::persistence)?;
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use polystore_core::{
        CancellationSource, Entity, PersistenceResult, Provider, Repository, TransactionError,
    };
    use proptest::prelude::*;

    use super::*;
    use crate::Command;

    #[derive(Debug, Default, Clone, Copy)]
    pub(crate) struct Faults {
        pub begin: bool,
        pub body: bool,
        pub save: bool,
        pub commit: bool,
        pub rollback: bool,
    }

    /// Unit of work that records calls instead of touching storage.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingUnitOfWork {
        pub calls: Vec<&'static str>,
        pub commits: u32,
        pub rollbacks: u32,
        pub faults: Faults,
        pub cancellation: Cancellation,
    }

    impl RecordingUnitOfWork {
        pub(crate) fn with_faults(faults: Faults) -> Self {
            Self {
                faults,
                ..Self::default()
            }
        }

        fn fail(&self, operation: &'static str) -> PersistenceError {
            PersistenceError::storage(
                Provider::Relational,
                operation,
                std::io::Error::other(format!("{operation} failed")),
            )
        }
    }

    #[async_trait]
    impl UnitOfWork for RecordingUnitOfWork {
        fn provider(&self) -> Provider {
            Provider::Relational
        }

        fn cancellation(&self) -> &Cancellation {
            &self.cancellation
        }

        fn repository<E: Entity>(&self) -> PersistenceResult<Arc<dyn Repository<E>>> {
            Err(PersistenceError::unregistered::<E>())
        }

        async fn save_changes(&mut self) -> PersistenceResult<u64> {
            self.calls.push("save");
            if self.faults.save {
                return Err(self.fail("save_changes"));
            }
            Ok(1)
        }

        async fn begin_transaction(&mut self) -> PersistenceResult<()> {
            self.calls.push("begin");
            if self.faults.begin {
                return Err(TransactionError::AlreadyActive.into());
            }
            Ok(())
        }

        async fn commit_transaction(&mut self) -> PersistenceResult<()> {
            self.calls.push("commit");
            if self.faults.commit {
                return Err(self.fail("commit_transaction"));
            }
            self.commits += 1;
            Ok(())
        }

        async fn rollback_transaction(&mut self) -> PersistenceResult<()> {
            self.calls.push("rollback");
            self.rollbacks += 1;
            if self.faults.rollback {
                return Err(self.fail("rollback_transaction"));
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    pub(crate) struct Touch;

    impl Command for Touch {
        const TRANSACTIONAL: bool = true;
    }

    #[derive(Debug, PartialEq, Eq)]
    pub(crate) struct BodyFailed;

    pub(crate) struct TouchHandler;

    #[async_trait]
    impl CommandHandler<RecordingUnitOfWork> for TouchHandler {
        type Cmd = Touch;
        type Output = &'static str;
        type Error = BodyFailed;

        async fn handle(
            &self,
            _command: Touch,
            uow: &mut RecordingUnitOfWork,
        ) -> Result<&'static str, BodyFailed> {
            uow.calls.push("body");
            if uow.faults.body {
                Err(BodyFailed)
            } else {
                Ok("done")
            }
        }
    }

    struct Stuck;

    #[async_trait]
    impl CommandHandler<RecordingUnitOfWork> for Stuck {
        type Cmd = Touch;
        type Output = ();
        type Error = BodyFailed;

        async fn handle(&self, _command: Touch, _uow: &mut RecordingUnitOfWork) -> Result<(), BodyFailed> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[tokio::test]
    async fn success_saves_then_commits() {
        let mut uow = RecordingUnitOfWork::default();
        let out = TransactionalBehavior
            .execute(&TouchHandler, Touch, &mut uow)
            .await
            .unwrap();
        assert_eq!(out, "done");
        assert_eq!(uow.calls, vec!["begin", "body", "save", "commit"]);
    }

    #[tokio::test]
    async fn body_error_rolls_back_and_is_returned_unchanged() {
        let mut uow = RecordingUnitOfWork::with_faults(Faults {
            body: true,
            ..Faults::default()
        });
        let err = TransactionalBehavior
            .execute(&TouchHandler, Touch, &mut uow)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Command(BodyFailed)));
        assert_eq!(uow.calls, vec!["begin", "body", "rollback"]);
    }

    #[tokio::test]
    async fn failed_rollback_keeps_both_errors() {
        let mut uow = RecordingUnitOfWork::with_faults(Faults {
            body: true,
            rollback: true,
            ..Faults::default()
        });
        let err = TransactionalBehavior
            .execute(&TouchHandler, Touch, &mut uow)
            .await
            .unwrap_err();
        assert_eq!(err.command_error(), Some(&BodyFailed));
        assert!(err.to_string().starts_with("rollback failed: "));
        match err {
            PipelineError::RollbackFailed { rollback, .. } => {
                assert!(rollback.to_string().contains("rollback_transaction"))
            }
            other => panic!("expected RollbackFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_failure_is_persistence_error() {
        let mut uow = RecordingUnitOfWork::with_faults(Faults {
            save: true,
            ..Faults::default()
        });
        let err = TransactionalBehavior
            .execute(&TouchHandler, Touch, &mut uow)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(uow.calls, vec!["begin", "body", "save", "rollback"]);
    }

    #[tokio::test]
    async fn failed_begin_is_returned_without_rollback() {
        let mut uow = RecordingUnitOfWork::with_faults(Faults {
            begin: true,
            ..Faults::default()
        });
        let err = TransactionalBehavior
            .execute(&TouchHandler, Touch, &mut uow)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Persistence(PersistenceError::Transaction(TransactionError::AlreadyActive))
        ));
        assert_eq!(uow.calls, vec!["begin"]);
        assert_eq!(uow.rollbacks, 0);
    }

    #[tokio::test]
    async fn commit_failure_rolls_back_once() {
        let mut uow = RecordingUnitOfWork::with_faults(Faults {
            commit: true,
            ..Faults::default()
        });
        let err = TransactionalBehavior
            .execute(&TouchHandler, Touch, &mut uow)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(uow.calls, vec!["begin", "body", "save", "commit", "rollback"]);
    }

    #[tokio::test]
    async fn cancelled_before_start_touches_nothing() {
        let source = CancellationSource::new();
        let mut uow = RecordingUnitOfWork {
            cancellation: source.token(),
            ..RecordingUnitOfWork::default()
        };
        source.cancel();

        let err = TransactionalBehavior
            .execute(&TouchHandler, Touch, &mut uow)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(uow.calls.is_empty());
        assert_eq!(uow.rollbacks, 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_running_body() {
        let source = CancellationSource::new();
        let mut uow = RecordingUnitOfWork {
            cancellation: source.token(),
            ..RecordingUnitOfWork::default()
        };

        let canceller = async {
            tokio::task::yield_now().await;
            source.cancel();
        };
        let (result, ()) = tokio::join!(TransactionalBehavior.execute(&Stuck, Touch, &mut uow), canceller);

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(uow.calls, vec!["begin", "rollback"]);
        assert_eq!(uow.commits, 0);
    }

    fn faults() -> impl Strategy<Value = Faults> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(begin, body, save, commit)| Faults {
                begin,
                body,
                save,
                commit,
                rollback: false,
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 100, ..ProptestConfig::default() })]

        #[test]
        fn exactly_one_of_commit_or_rollback_once_begun(faults in faults()) {
            let mut uow = RecordingUnitOfWork::with_faults(faults);
            let result = block_on(TransactionalBehavior.execute(&TouchHandler, Touch, &mut uow));

            let expected = if faults.begin { 0 } else { 1 };
            prop_assert_eq!(uow.commits + uow.rollbacks, expected);
            prop_assert_eq!(result.is_ok(), uow.commits == 1);
            if faults.body && !faults.begin {
                prop_assert!(matches!(result, Err(PipelineError::Command(BodyFailed))));
            }
        }
    }
}
