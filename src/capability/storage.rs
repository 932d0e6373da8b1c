//! Storage contracts: a key/value store and a query-based database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::capability::error::CapabilityError;
use crate::core::Payload;

/// A key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `None` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Payload>, CapabilityError>;

    /// Creates or overwrites.
    async fn set(&self, key: &str, value: Payload) -> Result<(), CapabilityError>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, CapabilityError>;

    /// A snapshot of every entry.
    async fn dump(&self) -> Result<HashMap<String, Payload>, CapabilityError>;

    /// Replaces the whole contents with `data`.
    async fn load(&self, data: HashMap<String, Payload>) -> Result<(), CapabilityError>;
}

/// A query-based database connection.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn connect(&self) -> Result<(), CapabilityError>;

    async fn disconnect(&self) -> Result<(), CapabilityError>;

    async fn query(&self, query: &str, params: &[Payload]) -> Result<Payload, CapabilityError>;
}

/// In-memory [`KeyValueStore`] backed by a `HashMap` behind a `RwLock`.
///
/// Nothing survives the process.
pub struct MemoryStore {
    data: RwLock<HashMap<String, Payload>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// A store pre-filled with `data`.
    pub fn with_data(data: HashMap<String, Payload>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Payload>, CapabilityError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Payload) -> Result<(), CapabilityError> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CapabilityError> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn dump(&self) -> Result<HashMap<String, Payload>, CapabilityError> {
        Ok(self.data.read().await.clone())
    }

    async fn load(&self, data: HashMap<String, Payload>) -> Result<(), CapabilityError> {
        *self.data.write().await = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();

        store.set("foo", json!("bar")).await.unwrap();
        assert_eq!(store.get("foo").await.unwrap(), Some(json!("bar")));

        assert!(store.delete("foo").await.unwrap());
        assert!(!store.delete("foo").await.unwrap());
        assert_eq!(store.get("foo").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", json!(1)).await.unwrap();
        store.set("k", json!(2)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_dump_and_load_replace_contents() {
        let store = MemoryStore::with_data(HashMap::from([("old".to_string(), json!(true))]));

        let mut fresh = HashMap::new();
        fresh.insert("a".to_string(), json!(1));
        fresh.insert("b".to_string(), json!({"nested": [1, 2]}));
        store.load(fresh.clone()).await.unwrap();

        assert_eq!(store.dump().await.unwrap(), fresh);
        assert_eq!(store.get("old").await.unwrap(), None);
    }
}
