//! Durable per-visitor key/value storage.
//!
//! The cart, the checkout handoff record and the signed-in identity all live
//! in storage that survives page reloads and the round trip through the
//! hosted payment page. In production that is the visitor's
//! `tower-sessions` session; tests use [`InMemoryStore`].
//!
//! Values are JSON, stored under the keys in [`keys`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tower_sessions::Session;

/// Storage keys.
pub mod keys {
    /// Cart lines (JSON array).
    pub const CART: &str = "cart";

    /// Checkout handoff record, written before the payment redirect.
    pub const ORDER_DATA: &str = "orderData";

    /// Signed-in user's profile.
    pub const USER: &str = "user";

    /// Bearer token for backend calls.
    pub const TOKEN: &str = "token";
}

/// Errors from durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying session store failed.
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A stored value could not be decoded into the expected type.
    #[error("could not decode stored `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for storage.
    #[error("could not encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key/value storage scoped to one visitor.
///
/// Every write is durable when its future resolves: a concurrent request
/// from the same visitor that loads afterwards sees it. There is no
/// batching.
pub trait DurableStore: Send + Sync {
    /// Read the raw JSON stored under `key`.
    fn get_raw(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StorageError>> + Send;

    /// Store raw JSON under `key`, replacing any previous value.
    fn insert_raw(
        &self,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Read and decode the value stored under `key`.
    fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>, StorageError>> + Send {
        async move {
            let Some(raw) = self.get_raw(key).await? else {
                return Ok(None);
            };
            serde_json::from_value(raw)
                .map(Some)
                .map_err(|source| StorageError::Decode {
                    key: key.to_string(),
                    source,
                })
        }
    }

    /// Encode and store a value under `key`.
    fn insert<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        async move {
            let raw = serde_json::to_value(value)?;
            self.insert_raw(key, raw).await
        }
    }
}

/// Writes go straight to the session store instead of waiting for the
/// session layer to save at the end of the response.
impl DurableStore for Session {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.get_value(key).await?)
    }

    async fn insert_raw(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.insert_value(key, value).await?;
        self.save().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.remove_value(key).await?.is_some() {
            self.save().await?;
        }
        Ok(())
    }
}

/// Process-local storage for tests and tooling.
///
/// Clones share the same map, so two handles behave like two page loads of
/// the same visitor.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a key currently holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn insert_raw(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_typed_round_trip() {
        let store = InMemoryStore::new();
        store.insert(keys::TOKEN, &"abc").await.unwrap();

        let token: Option<String> = store.get(keys::TOKEN).await.unwrap();
        assert_eq!(token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_missing_key_is_none_and_remove_is_idempotent() {
        let store = InMemoryStore::new();
        let value: Option<String> = store.get(keys::CART).await.unwrap();
        assert!(value.is_none());

        store.remove(keys::CART).await.unwrap();
        store.remove(keys::CART).await.unwrap();
    }

    #[tokio::test]
    async fn test_decode_error_names_key() {
        let store = InMemoryStore::new();
        store
            .insert_raw(keys::ORDER_DATA, serde_json::json!("not a record"))
            .await
            .unwrap();

        let err = store
            .get::<Vec<u32>>(keys::ORDER_DATA)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Decode { ref key, .. } if key == "orderData"));
    }

    #[tokio::test]
    async fn test_session_writes_reach_the_store() {
        use tower_sessions::{MemoryStore, SessionStore};

        let backing = Arc::new(MemoryStore::default());
        let session = Session::new(None, Arc::clone(&backing), None);

        DurableStore::insert(&session, keys::ORDER_DATA, &"record")
            .await
            .unwrap();
        let id = session.id().unwrap();
        let stored = backing.load(&id).await.unwrap().unwrap();
        assert_eq!(stored.data.get(keys::ORDER_DATA), Some(&serde_json::json!("record")));

        // A second handle loads what the first one wrote.
        let reload = Session::new(Some(id), Arc::clone(&backing), None);
        let seen: Option<String> = DurableStore::get(&reload, keys::ORDER_DATA).await.unwrap();
        assert_eq!(seen.as_deref(), Some("record"));

        DurableStore::remove(&session, keys::ORDER_DATA).await.unwrap();
        let stored = backing.load(&id).await.unwrap().unwrap();
        assert!(!stored.data.contains_key(keys::ORDER_DATA));
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let first = InMemoryStore::new();
        let second = first.clone();
        first.insert(keys::USER, &1_u32).await.unwrap();
        assert!(second.contains(keys::USER));
    }
}
