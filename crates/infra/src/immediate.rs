//! Session for providers whose writes are durable as soon as they return.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use polystore_core::Cancellation;

/// Shared client plus a count of writes applied since the last save.
///
/// The count only feeds the `save_changes` result and the rollback warning;
/// nothing is buffered.
pub struct ImmediateSession<C: ?Sized> {
    client: Arc<C>,
    writes: AtomicU64,
    cancel: Cancellation,
}

impl<C: ?Sized> ImmediateSession<C> {
    pub fn new(client: Arc<C>, cancel: Cancellation) -> Self {
        Self {
            client,
            writes: AtomicU64::new(0),
            cancel,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    pub(crate) fn record_write(&self, count: u64) {
        self.writes.fetch_add(count, Ordering::Relaxed);
    }

    /// Writes since the last call; resets the counter.
    pub(crate) fn take_writes(&self) -> u64 {
        self.writes.swap(0, Ordering::Relaxed)
    }

    pub fn pending_writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl<C: ?Sized> core::fmt::Debug for ImmediateSession<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImmediateSession")
            .field("writes", &self.pending_writes())
            .finish_non_exhaustive()
    }
}
