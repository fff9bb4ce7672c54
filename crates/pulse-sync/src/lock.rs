//! Single in-flight sync guard.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Allows at most one sync to run at a time.
///
/// Cloning shares the lock, so every orchestrator built with the same
/// `SyncLock` is mutually exclusive.
#[derive(Debug, Clone, Default)]
pub struct SyncLock {
    inner: Arc<Mutex<()>>,
}

/// Held for the duration of one sync; releases the lock when dropped.
#[derive(Debug)]
pub struct SyncGuard {
    _guard: OwnedMutexGuard<()>,
}

impl SyncLock {
    /// Create an unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock if it is free. Never waits.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SyncGuard> {
        self.inner
            .clone()
            .try_lock_owned()
            .ok()
            .map(|guard| SyncGuard { _guard: guard })
    }

    /// Returns true while a sync holds the lock.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let lock = SyncLock::new();
        let shared = lock.clone();

        let guard = lock.try_acquire().unwrap();
        assert!(shared.is_held());
        assert!(shared.try_acquire().is_none());

        drop(guard);
        assert!(!lock.is_held());
        assert!(shared.try_acquire().is_some());
    }
}
