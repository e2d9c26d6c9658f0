//! Temporarily set or clear environment variables in tests.
//!
//! `std::env::set_var` and `remove_var` are `unsafe` in Rust 2024. Hold an
//! [`EnvLock`](crate::env_lock::EnvLock) while a guard is alive; the guard
//! restores the previous value on drop.
//!
//! ```rust,ignore
//! use test_support::{env_lock::EnvLock, env_var_guard::EnvVarGuard};
//!
//! let _lock = EnvLock::acquire();
//! let _render = EnvVarGuard::set("KILN_RENDER", "d3d11");
//! ```

use std::ffi::OsString;

/// Restores a variable to its previous value when dropped.
#[derive(Debug)]
pub struct EnvVarGuard {
    name: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    /// Set `name` to `val` until the guard is dropped.
    #[must_use]
    pub fn set(name: &'static str, val: &str) -> Self {
        let prev = std::env::var_os(name);
        // SAFETY: callers hold `EnvLock`, serialising environment mutation.
        unsafe { std::env::set_var(name, val) };
        Self { name, prev }
    }

    /// Clear `name` until the guard is dropped.
    #[must_use]
    pub fn remove(name: &'static str) -> Self {
        let prev = std::env::var_os(name);
        // SAFETY: callers hold `EnvLock`, serialising environment mutation.
        unsafe { std::env::remove_var(name) };
        Self { name, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: the lock is still held while the guard is alive.
        unsafe {
            match &self.prev {
                Some(value) => std::env::set_var(self.name, value),
                None => std::env::remove_var(self.name),
            }
        }
    }
}
