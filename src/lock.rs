//! Per-record single-flight lock

use crate::error::{Result, SyncError};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// At most one outstanding request per record.
///
/// Acquisition never waits: a second caller gets [`SyncError::Busy`]
/// instead of being queued.
#[derive(Debug, Clone, Default)]
pub struct MutationLock {
    inner: Arc<Mutex<()>>,
}

/// Held for the whole request; released on drop
#[derive(Debug)]
pub struct MutationGuard {
    _guard: OwnedMutexGuard<()>,
}

impl MutationLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<MutationGuard> {
        let guard = Arc::clone(&self.inner)
            .try_lock_owned()
            .map_err(|_| SyncError::Busy)?;
        Ok(MutationGuard { _guard: guard })
    }

    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
