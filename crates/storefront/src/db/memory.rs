//! In-process document store.
//!
//! Used by the test suites and for running the storefront without a
//! database. Writes to paths registered with
//! [`MemoryDocumentStore::fail_writes_to`] fail as if the backend timed out,
//! which lets callers exercise partial-failure handling.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use shopfront_core::DocumentId;

use super::{CollectionPath, Document, DocumentPath, DocumentStore, JsonMap, RepositoryError};

#[derive(Debug, Default)]
struct Inner {
    // Keyed by full path; BTreeMap keeps listings ordered by id.
    documents: BTreeMap<String, StoredDocument>,
    failing: HashSet<String>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    collection: String,
    id: String,
    data: JsonMap,
}

impl StoredDocument {
    fn to_document(&self) -> Document {
        Document {
            id: DocumentId::new(self.id.clone()),
            data: self.data.clone(),
        }
    }
}

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write to `path` fail.
    pub fn fail_writes_to(&self, path: &DocumentPath) {
        self.lock().failing.insert(path.as_str().to_owned());
    }

    /// Make every subsequent write to any document in `collection` fail.
    pub fn fail_writes_in(&self, collection: &CollectionPath) {
        self.lock().failing.insert(collection.as_str().to_owned());
    }

    /// Number of documents currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().documents.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a document half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn check_writable(&self, path: &DocumentPath) -> Result<(), RepositoryError> {
        if self.failing.contains(path.as_str()) || self.failing.contains(path.parent().as_str()) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn in_collection<'a>(
        &'a self,
        collection: &'a CollectionPath,
    ) -> impl Iterator<Item = &'a StoredDocument> + 'a {
        self.documents
            .values()
            .filter(move |doc| doc.collection == collection.as_str())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, RepositoryError> {
        Ok(self
            .lock()
            .documents
            .get(path.as_str())
            .map(StoredDocument::to_document))
    }

    async fn set(&self, path: &DocumentPath, data: JsonMap) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        inner.check_writable(path)?;
        inner.documents.insert(
            path.as_str().to_owned(),
            StoredDocument {
                collection: path.parent().as_str().to_owned(),
                id: path.id().to_owned(),
                data,
            },
        );
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: JsonMap) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        inner.check_writable(path)?;
        let Some(doc) = inner.documents.get_mut(path.as_str()) else {
            return Ok(false);
        };
        doc.data.extend(fields);
        Ok(true)
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        inner.check_writable(path)?;
        inner.documents.remove(path.as_str());
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        data: JsonMap,
    ) -> Result<DocumentId, RepositoryError> {
        let id = Uuid::new_v4().simple().to_string();
        let path = collection.doc(&id)?;
        self.set(&path, data).await?;
        Ok(DocumentId::new(id))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, RepositoryError> {
        let inner = self.lock();
        let mut docs: Vec<Document> = inner
            .in_collection(collection)
            .map(StoredDocument::to_document)
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn find_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, RepositoryError> {
        let inner = self.lock();
        let mut docs: Vec<Document> = inner
            .in_collection(collection)
            .filter(|doc| doc.data.get(field) == Some(value))
            .map(StoredDocument::to_document)
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn increment(
        &self,
        path: &DocumentPath,
        field: &str,
        delta: i64,
        max: i64,
        seed: JsonMap,
    ) -> Result<i64, RepositoryError> {
        let mut inner = self.lock();
        inner.check_writable(path)?;

        if let Some(doc) = inner.documents.get_mut(path.as_str()) {
            let current = doc.data.get(field).and_then(Value::as_i64).unwrap_or(0);
            let next = current.saturating_add(delta).min(max);
            doc.data.insert(field.to_owned(), Value::from(next));
            return Ok(next);
        }

        let first = delta.min(max);
        let mut data = seed;
        data.insert(field.to_owned(), Value::from(first));
        inner.documents.insert(
            path.as_str().to_owned(),
            StoredDocument {
                collection: path.parent().as_str().to_owned(),
                id: path.id().to_owned(),
                data,
            },
        );
        Ok(first)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::to_document;

    fn path(p: &str) -> DocumentPath {
        DocumentPath::parse(p).unwrap()
    }

    fn body(value: &Value) -> JsonMap {
        to_document(value).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryDocumentStore::new();
        let p = path("user-data/u1");

        assert!(store.get(&p).await.unwrap().is_none());
        store.set(&p, body(&json!({ "a": 1 }))).await.unwrap();

        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.id.as_str(), "u1");
        assert_eq!(doc.data["a"], json!(1));

        store.delete(&p).await.unwrap();
        assert!(store.get(&p).await.unwrap().is_none());
        // Deleting again is not an error
        store.delete(&p).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_only_touches_existing() {
        let store = MemoryDocumentStore::new();
        let p = path("user-data/u1/cart/A");

        assert!(!store.update(&p, body(&json!({ "quantity": 3 }))).await.unwrap());
        assert!(store.is_empty());

        store
            .set(&p, body(&json!({ "itemId": "A", "quantity": 1 })))
            .await
            .unwrap();
        assert!(store.update(&p, body(&json!({ "quantity": 3 }))).await.unwrap());

        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.data["quantity"], json!(3));
        assert_eq!(doc.data["itemId"], json!("A"));
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_direct_children() {
        let store = MemoryDocumentStore::new();
        store.set(&path("user-data/u1"), JsonMap::new()).await.unwrap();
        store
            .set(&path("user-data/u1/cart/B"), body(&json!({ "quantity": 1 })))
            .await
            .unwrap();
        store
            .set(&path("user-data/u1/cart/A"), body(&json!({ "quantity": 1 })))
            .await
            .unwrap();
        store
            .set(&path("user-data/u2/cart/C"), body(&json!({ "quantity": 1 })))
            .await
            .unwrap();

        let cart = path("user-data/u1").collection("cart").unwrap();
        let ids: Vec<String> = store
            .list(&cart)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_find_eq() {
        let store = MemoryDocumentStore::new();
        let addresses = path("user-data/u1").collection("addresses").unwrap();
        store
            .add(&addresses, body(&json!({ "default": true })))
            .await
            .unwrap();
        store
            .add(&addresses, body(&json!({ "default": false })))
            .await
            .unwrap();

        let defaults = store
            .find_eq(&addresses, "default", &json!(true))
            .await
            .unwrap();
        assert_eq!(defaults.len(), 1);
    }

    #[tokio::test]
    async fn test_increment_creates_then_adds() {
        let store = MemoryDocumentStore::new();
        let p = path("user-data/u1/cart/A");
        let seed = body(&json!({ "itemId": "A" }));

        assert_eq!(store.increment(&p, "quantity", 2, 100, seed.clone()).await.unwrap(), 2);
        assert_eq!(store.increment(&p, "quantity", 5, 100, seed).await.unwrap(), 7);

        let doc = store.get(&p).await.unwrap().unwrap();
        assert_eq!(doc.data, body(&json!({ "itemId": "A", "quantity": 7 })));
    }

    #[tokio::test]
    async fn test_increment_clamps_to_max() {
        let store = MemoryDocumentStore::new();
        let p = path("user-data/u1/cart/A");

        assert_eq!(store.increment(&p, "quantity", 12, 10, JsonMap::new()).await.unwrap(), 10);
        assert_eq!(store.increment(&p, "quantity", 1, 10, JsonMap::new()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_failing_paths_reject_writes() {
        let store = MemoryDocumentStore::new();
        let p = path("user-data/u1/cart/A");
        store.fail_writes_to(&p);

        assert!(matches!(
            store.set(&p, JsonMap::new()).await,
            Err(RepositoryError::Database(_))
        ));
        assert!(store.increment(&p, "quantity", 1, 100, JsonMap::new()).await.is_err());
        assert!(store.is_empty());
    }
}
