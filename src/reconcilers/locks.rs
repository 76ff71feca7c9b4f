// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-object serialization.
//!
//! Every `(namespace, name)` gets a lazily created async mutex held for a whole
//! reconciliation. The map itself sits behind a short-lived std mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as KeyMutex;

#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<KeyMutex<()>>>>,
}

impl KeyLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutex of `namespace/name`, created on first use.
    #[must_use]
    pub fn get(&self, namespace: &str, name: &str) -> Arc<KeyMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(key(namespace, name))
            .or_insert_with(|| Arc::new(KeyMutex::new(())))
            .clone()
    }

    /// Drop the entry of `namespace/name` unless someone holds or waits on it.
    /// Returns whether the entry was removed.
    pub fn prune(&self, namespace: &str, name: &str) -> bool {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let key = key(namespace, name);
        let idle = locks.get(&key).is_some_and(is_idle);
        if idle {
            locks.remove(&key);
        }
        idle
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_idle(lock: &Arc<KeyMutex<()>>) -> bool {
    Arc::strong_count(lock) == 1 && lock.try_lock().is_ok()
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod locks_tests;
