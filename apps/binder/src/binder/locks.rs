use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

/// One async lock per binder, so multi-step operations on the same binder never
/// interleave. Operations on different binders run concurrently.
///
/// A binder's entry lives only while someone holds or waits for its lock.
#[derive(Clone, Default)]
pub struct BinderLocks {
    locks: LockMap,
}

impl BinderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `binder_id`. Released when the guard drops.
    pub async fn acquire(&self, binder_id: Uuid) -> BinderGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(binder_id).or_default().clone()
        };
        BinderGuard {
            guard: Some(lock.lock_owned().await),
            binder_id,
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive access to one binder.
pub struct BinderGuard {
    guard: Option<OwnedMutexGuard<()>>,
    binder_id: Uuid,
    locks: LockMap,
}

impl Drop for BinderGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map still references the lock: no holder, no waiter.
        if locks
            .get(&self.binder_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.binder_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_binder_is_exclusive() {
        let locks = BinderLocks::new();
        let id = Uuid::new_v4();
        let guard = locks.acquire(id).await;

        let waiting = tokio::spawn({
            let locks = locks.clone();
            async move {
                let _guard = locks.acquire(id).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_binders_do_not_block() {
        let locks = BinderLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(Uuid::new_v4()))
            .await
            .expect("second binder lock should be free");
    }

    #[tokio::test]
    async fn test_released_locks_are_forgotten() {
        let locks = BinderLocks::new();
        for _ in 0..100 {
            drop(locks.acquire(Uuid::new_v4()).await);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_lock_kept_while_waiter_pending() {
        let locks = BinderLocks::new();
        let id = Uuid::new_v4();
        let guard = locks.acquire(id).await;

        let waiting = tokio::spawn({
            let locks = locks.clone();
            async move {
                let _guard = locks.acquire(id).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert_eq!(locks.tracked(), 1, "the waiter still needs the entry");

        waiting.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
