use kandra_core::{KandraError, Result};
use tokio::sync::{Mutex, OwnedMutexGuard};
use std::sync::Arc;

/// A single global execution slot. Only one job may be mid-`execute_plan`
/// at a time; everything else queues behind [`ExecutionLock::acquire`] or
/// bails out immediately with [`ExecutionLock::try_acquire`].
#[derive(Clone)]
pub struct ExecutionLock {
    inner: Arc<Mutex<()>>,
}

impl ExecutionLock {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(())) }
    }

    /// Block until the slot is free.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.inner.clone().lock_owned().await
    }

    /// Take the slot only if it's free right now.
    pub fn try_acquire(&self) -> Result<OwnedMutexGuard<()>> {
        self.inner.clone().try_lock_owned().map_err(|_| KandraError::ExecutionLockHeld)
    }
}

impl Default for ExecutionLock {
    fn default() -> Self {
        Self::new()
    }
}
