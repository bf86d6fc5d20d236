//! Test utilities for tests that need environment variable isolation.
//!
//! Token lookup, config paths and install discovery all read process-wide
//! environment variables, so tests touching them must be serialized.

use std::env;
use std::sync::Mutex;

/// Shared lock to serialize tests that depend on environment variables.
///
/// Acquire it before creating any [`EnvVarGuard`].
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard that restores an environment variable to its original value on drop.
///
/// # Example
///
/// ```ignore
/// let _lock = ENV_LOCK.lock().unwrap();
/// let _env = EnvVarGuard::set("NAPCAT_QCE_TOKEN", "abc");
/// // ... code under test reads NAPCAT_QCE_TOKEN ...
/// ```
pub struct EnvVarGuard {
    key: String,
    previous: Option<String>,
}

impl EnvVarGuard {
    /// Set an environment variable and return a guard that will restore it.
    #[allow(unsafe_code)]
    pub fn set(key: &str, value: &str) -> Self {
        let previous = env::var(key).ok();
        unsafe {
            env::set_var(key, value);
        }
        Self {
            key: key.to_string(),
            previous,
        }
    }

    /// Unset an environment variable for the lifetime of the guard.
    #[allow(unsafe_code)]
    pub fn remove(key: &str) -> Self {
        let previous = env::var(key).ok();
        unsafe {
            env::remove_var(key);
        }
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvVarGuard {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        match self.previous {
            Some(ref value) => unsafe {
                env::set_var(&self.key, value);
            },
            None => unsafe {
                env::remove_var(&self.key);
            },
        }
    }
}
