//! Per-key async critical sections.
//!
//! Every key gets its own `tokio::sync::Mutex`, created on first use. The
//! table only keeps a `Weak` to it; when the last holder or waiter drops its
//! `Arc` (released, failed or cancelled) the slot removes itself. Requests for
//! different keys never wait on each other; requests for the same key run
//! their read-modify-write one at a time.
//!
//! This serializes within one process only. Instances sharing a cache still
//! race each other.

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

type Table = DashMap<String, Weak<Mutex<Slot>>>;

#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Arc<Table>,
}

// Lives inside the mutex; dropped with the last Arc to it
#[derive(Debug)]
struct Slot {
    key: String,
    table: Arc<Table>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        // a newer slot may already sit under the same key
        self.table
            .remove_if(&self.key, |_, slot| slot.strong_count() == 0);
    }
}

/// Exclusive access to one key until dropped.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<Slot>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `key` is free and take it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        // the shard lock is released before the await
        let mutex = {
            let mut entry = self.locks.entry(key.to_string()).or_default();
            match entry.upgrade() {
                Some(mutex) => mutex,
                None => {
                    let mutex = Arc::new(Mutex::new(Slot {
                        key: key.to_string(),
                        table: Arc::clone(&self.locks),
                    }));
                    *entry = Arc::downgrade(&mutex);
                    mutex
                }
            }
        };

        KeyGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
