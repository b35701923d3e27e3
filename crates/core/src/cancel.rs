//! Cooperative cancellation for storage operations.
//!
//! A [`CancellationSource`] is held by whoever owns the logical operation (e.g.
//! the request handler); the [`Cancellation`] token it hands out travels with
//! the unit of work and is checked by every storage call.

use core::future::Future;

use tokio::sync::watch;

use crate::error::{PersistenceError, PersistenceResult};

/// Owner side: flips the shared flag.
#[derive(Debug)]
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side. Cheap to clone; `Cancellation::none()` never fires.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    pub fn none() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested (never, if the source is gone).
    pub async fn cancelled(&self) {
        if let Some(rx) = &self.rx {
            let mut rx = rx.clone();
            if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        core::future::pending::<()>().await
    }

    /// Run `fut` unless cancellation is requested first.
    pub async fn guard<T, F>(&self, operation: &'static str, fut: F) -> PersistenceResult<T>
    where
        F: Future<Output = PersistenceResult<T>>,
    {
        if self.is_cancelled() {
            return Err(PersistenceError::Cancelled { operation });
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(PersistenceError::Cancelled { operation }),
            result = fut => result,
        }
    }
}
