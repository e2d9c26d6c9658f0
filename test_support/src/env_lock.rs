//! Serialise environment mutations across tests.
//!
//! Configuration layering reads `KILN_*` variables from the process
//! environment, so tests that set them must not overlap.

use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard holding the global environment lock.
#[derive(Debug)]
pub struct EnvLock {
    _guard: MutexGuard<'static, ()>,
}

impl EnvLock {
    /// Acquire the lock, recovering it if a previous holder panicked.
    pub fn acquire() -> Self {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self { _guard: guard }
    }
}
