//! Per-user mutation locks.
//!
//! Cart mutations are read-modify-write cycles against the store. Holding
//! the user's lock across the cycle keeps two concurrent requests for the
//! same user from overwriting each other's changes. Different users proceed
//! in parallel.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};

use shopcart_core::UserId;

/// Dead entries are purged once the map grows past this size.
const CLEANUP_THRESHOLD: usize = 256;

/// Keyed async mutex, one per user id.
///
/// Entries are held as `Weak` references, so a user's mutex is freed once
/// no request holds or waits on it.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: std::sync::Mutex<HashMap<UserId, Weak<Mutex<()>>>>,
}

/// Holds a user's lock until dropped.
#[derive(Debug)]
pub struct UserGuard {
    _guard: OwnedMutexGuard<()>,
}

impl UserLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s cart.
    pub async fn acquire(&self, user_id: &UserId) -> UserGuard {
        let mutex = {
            let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

            let mutex = map
                .get(user_id)
                .and_then(Weak::upgrade)
                .unwrap_or_else(|| {
                    let mutex = Arc::new(Mutex::new(()));
                    map.insert(user_id.clone(), Arc::downgrade(&mutex));
                    mutex
                });

            if map.len() > CLEANUP_THRESHOLD {
                map.retain(|_, weak| weak.strong_count() > 0);
            }

            mutex
        };

        UserGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of users with a live lock entry.
    #[cfg(test)]
    fn active_users(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
