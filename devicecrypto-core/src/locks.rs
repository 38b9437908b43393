//! Per-alias serialization of mutating operations.
//!
//! A create, delete, or authenticate call for a given alias must complete
//! (or fail) before another such call for the same alias begins; operations
//! on different aliases proceed fully in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Async per-alias lock registry.
///
/// Guards are owned so a holder can keep them across suspension points
/// (trust-boundary calls, prompt presentation); every such hold is bounded
/// by the caller's own timeout.
#[derive(Debug)]
pub(crate) struct AliasLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AliasLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, alias: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("alias lock registry poisoned");
        Arc::clone(locks.entry(alias.to_owned()).or_default())
    }

    /// Acquires the lock for `alias`, waiting until the current holder (if
    /// any) completes.
    pub async fn acquire(&self, alias: &str) -> OwnedMutexGuard<()> {
        self.entry(alias).lock_owned().await
    }
}
