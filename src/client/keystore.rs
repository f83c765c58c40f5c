//! Key storage.
//!
//! A [`KeyStore`] maps account IDs to key pairs. The crate ships the
//! in-memory backend; persistent backends implement the same trait.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::types::{AccountId, KeyPair};

/// Storage contract for signing keys.
///
/// The store owns its key pairs; [`get`](KeyStore::get) hands out clones
/// that callers drop once signing completes. The default backend keeps at
/// most one key per account — adding again replaces. Backends holding
/// several keys per account must expose their own selector; the core only
/// consumes this simple mapping.
pub trait KeyStore: Send + Sync {
    /// Add (or replace) the key for an account.
    fn add(&self, account_id: &AccountId, key_pair: KeyPair);

    /// The key for an account, if present.
    fn get(&self, account_id: &AccountId) -> Option<KeyPair>;

    /// Remove the key for an account.
    fn remove(&self, account_id: &AccountId);

    /// All account IDs with stored keys.
    fn list(&self) -> Vec<AccountId>;

    /// Whether a key exists for an account.
    fn contains(&self, account_id: &AccountId) -> bool {
        self.get(account_id).is_some()
    }
}

/// In-memory key store. Keys vanish with the process.
///
/// Per-account consistency comes from the single `RwLock`: a reader never
/// observes a half-replaced entry.
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<AccountId, KeyPair>>,
}

impl InMemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated from `(account_id, secret_key)` string
    /// pairs. Entries that fail to parse are skipped.
    pub fn from_keys(keys: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (account_id, secret_key) in keys {
            if let (Ok(account_id), Ok(pair)) =
                (account_id.parse::<AccountId>(), secret_key.parse::<KeyPair>())
            {
                store.add(&account_id, pair);
            }
        }
        store
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.keys.write().unwrap().clear();
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().unwrap().is_empty()
    }
}

impl std::fmt::Debug for InMemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyStore")
            .field("accounts", &self.list())
            .finish()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn add(&self, account_id: &AccountId, key_pair: KeyPair) {
        self.keys
            .write()
            .unwrap()
            .insert(account_id.clone(), key_pair);
    }

    fn get(&self, account_id: &AccountId) -> Option<KeyPair> {
        self.keys.read().unwrap().get(account_id).cloned()
    }

    fn remove(&self, account_id: &AccountId) {
        self.keys.write().unwrap().remove(account_id);
    }

    fn list(&self) -> Vec<AccountId> {
        self.keys.read().unwrap().keys().cloned().collect()
    }
}
