//! Device key-value storage.
//!
//! The device-local cart lives in a single string slot of the visitor's
//! storage. In the storefront that storage is the browser session
//! ([`SessionStorage`]); [`MemoryStorage`] backs tests and tooling.
//!
//! Access is synchronous: [`SessionStorage`] loads the slots it needs once
//! per request and writes back changed slots with
//! [`SessionStorage::persist`].

use std::collections::{HashMap, HashSet};

use tower_sessions::Session;

/// Synchronous string key-value storage, last write wins.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&mut self, key: &str, value: String);
}

/// Plain in-memory storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.items.insert(key.to_owned(), value);
    }
}

/// Snapshot of selected session slots.
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    items: HashMap<String, String>,
    dirty: HashSet<String>,
}

impl SessionStorage {
    /// Load `keys` from the session.
    ///
    /// A slot holding something other than a string reads as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(
        session: &Session,
        keys: &[&str],
    ) -> Result<Self, tower_sessions::session::Error> {
        let mut items = HashMap::new();
        for key in keys {
            match session.get::<String>(key).await {
                Ok(Some(value)) => {
                    items.insert((*key).to_owned(), value);
                }
                Ok(None) => {}
                Err(tower_sessions::session::Error::SerdeJson(e)) => {
                    tracing::warn!(key, error = %e, "Ignoring non-string session slot");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Self {
            items,
            dirty: HashSet::new(),
        })
    }

    /// Write changed slots back to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn persist(&mut self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        for key in self.dirty.drain() {
            if let Some(value) = self.items.get(&key) {
                session.insert(&key, value).await?;
            }
        }
        Ok(())
    }

    /// Whether any slot changed since loading.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }
}

impl KeyValueStore for SessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.dirty.insert(key.to_owned());
        self.items.insert(key.to_owned(), value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[test]
    fn test_memory_storage_last_write_wins() {
        let mut storage = MemoryStorage::new();
        assert!(storage.get_item("cart").is_none());

        storage.set_item("cart", "[]".to_string());
        storage.set_item("cart", "null".to_string());
        assert_eq!(storage.get_item("cart").as_deref(), Some("null"));
    }

    #[tokio::test]
    async fn test_session_storage_round_trip() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        let mut storage = SessionStorage::load(&session, &["cart"]).await.unwrap();
        assert!(storage.get_item("cart").is_none());
        assert!(!storage.is_dirty());

        storage.set_item("cart", r#"[{"itemId":"A","quantity":1}]"#.to_string());
        assert!(storage.is_dirty());
        storage.persist(&session).await.unwrap();
        assert!(!storage.is_dirty());

        let reloaded = SessionStorage::load(&session, &["cart"]).await.unwrap();
        assert_eq!(
            reloaded.get_item("cart").as_deref(),
            Some(r#"[{"itemId":"A","quantity":1}]"#)
        );
    }

    #[tokio::test]
    async fn test_session_storage_ignores_non_string_slot() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session.insert("cart", 42).await.unwrap();

        let storage = SessionStorage::load(&session, &["cart"]).await.unwrap();
        assert!(storage.get_item("cart").is_none());
    }
}
