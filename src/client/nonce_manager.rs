//! Nonce allocation for concurrent transaction submission.
//!
//! Access-key nonces must strictly increase. When several transactions are
//! in flight faster than the chain finalizes, refetching the nonce for each
//! would hand the same value to multiple signers. The manager fetches once
//! per access key (single-flight) and then hands out consecutive values
//! from the local cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Issues strictly increasing nonces per `(account_id, public_key)` pair.
///
/// Each pair owns a slot guarded by an async mutex. The first task to lock
/// a cold slot performs the fetch while every concurrent caller for the
/// same pair queues on the lock and then reads the cached value, so at
/// most one fetch is ever outstanding per pair. A failed fetch leaves the
/// slot cold and the next caller retries.
pub struct NonceManager {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Option<u64>>>>>,
}

impl Default for NonceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceManager {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, account_id: &str, public_key: &str) -> Arc<tokio::sync::Mutex<Option<u64>>> {
        let key = format!("{account_id}:{public_key}");
        let mut slots = self.slots.lock().unwrap();
        slots.entry(key).or_default().clone()
    }

    /// Get the next nonce for an access key.
    ///
    /// `fetch` resolves the nonce currently recorded on chain; it runs at
    /// most once per cache lifetime, no matter how many callers race. The
    /// returned values are `fetched + 1`, `fetched + 2`, … with no gaps or
    /// duplicates.
    pub async fn get_next_nonce<F, Fut>(
        &self,
        account_id: &str,
        public_key: &str,
        fetch: F,
    ) -> Result<u64, crate::Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<u64, crate::Error>>,
    {
        let slot = self.slot(account_id, public_key);
        let mut guard = slot.lock().await;

        let next = match *guard {
            Some(current) => current + 1,
            None => fetch().await? + 1,
        };
        *guard = Some(next);
        Ok(next)
    }

    /// Drop the cached nonce for an access key.
    ///
    /// Call on an observed invalid-nonce error (or after cancelling a send
    /// mid-flight); the next caller refetches from chain.
    pub fn invalidate(&self, account_id: &str, public_key: &str) {
        let key = format!("{account_id}:{public_key}");
        self.slots.lock().unwrap().remove(&key);
    }

    /// Drop all cached state. Intended for test isolation.
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }
}

impl std::fmt::Debug for NonceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().unwrap();
        f.debug_struct("NonceManager")
            .field("tracked_keys", &slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn first_call_fetches_then_increments() {
        let manager = NonceManager::new();

        let n1 = manager
            .get_next_nonce("alice.near", "ed25519:abc", || async { Ok(100) })
            .await
            .unwrap();
        assert_eq!(n1, 101);

        for expected in [102, 103, 104] {
            let n = manager
                .get_next_nonce("alice.near", "ed25519:abc", || async {
                    panic!("must not refetch")
                })
                .await
                .unwrap();
            assert_eq!(n, expected);
        }
    }

    #[tokio::test]
    async fn concurrent_callers_get_contiguous_nonces() {
        const N: u64 = 32;
        let manager = Arc::new(NonceManager::new());
        let fetches = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..N {
            let manager = manager.clone();
            let fetches = fetches.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .get_next_nonce("alice.near", "ed25519:abc", move || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        // Yield so racing callers pile up on the slot lock.
                        tokio::task::yield_now().await;
                        Ok(100)
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut nonces = Vec::new();
        for handle in handles {
            nonces.push(handle.await.unwrap());
        }
        nonces.sort_unstable();

        assert_eq!(fetches.load(Ordering::SeqCst), 1, "single-flight violated");
        let expected: Vec<u64> = (101..101 + N).collect();
        assert_eq!(nonces, expected);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let manager = NonceManager::new();

        let n1 = manager
            .get_next_nonce("alice.near", "ed25519:abc", || async { Ok(10) })
            .await
            .unwrap();
        assert_eq!(n1, 11);

        manager.invalidate("alice.near", "ed25519:abc");

        let n2 = manager
            .get_next_nonce("alice.near", "ed25519:abc", || async { Ok(20) })
            .await
            .unwrap();
        assert_eq!(n2, 21);
    }

    #[tokio::test]
    async fn failed_fetch_clears_in_flight_state() {
        let manager = NonceManager::new();

        let err = manager
            .get_next_nonce("alice.near", "ed25519:abc", || async {
                Err(crate::Error::Config("rpc down".into()))
            })
            .await;
        assert!(err.is_err());

        // The next caller retries the fetch instead of seeing stale state.
        let n = manager
            .get_next_nonce("alice.near", "ed25519:abc", || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(n, 6);
    }

    #[tokio::test]
    async fn pairs_are_independent() {
        let manager = NonceManager::new();

        let alice = manager
            .get_next_nonce("alice.near", "ed25519:abc", || async { Ok(10) })
            .await
            .unwrap();
        let alice_second_key = manager
            .get_next_nonce("alice.near", "ed25519:xyz", || async { Ok(50) })
            .await
            .unwrap();
        let bob = manager
            .get_next_nonce("bob.near", "ed25519:abc", || async { Ok(70) })
            .await
            .unwrap();

        assert_eq!(alice, 11);
        assert_eq!(alice_second_key, 51);
        assert_eq!(bob, 71);
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let manager = NonceManager::new();
        manager
            .get_next_nonce("alice.near", "ed25519:abc", || async { Ok(10) })
            .await
            .unwrap();
        manager.clear();

        let n = manager
            .get_next_nonce("alice.near", "ed25519:abc", || async { Ok(40) })
            .await
            .unwrap();
        assert_eq!(n, 41);
    }
}
