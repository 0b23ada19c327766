//! Document storage for storefront.
//!
//! # Data layout
//!
//! All remote state lives in a document store addressed by slash-separated
//! paths, alternating collection and document segments:
//!
//! - `user-data/{uid}` - Opaque per-user profile document
//! - `user-data/{uid}/cart/{itemId}` - One cart line per item
//! - `user-data/{uid}/addresses/{addressId}` - Delivery addresses
//!
//! See [`paths`] for the builders.
//!
//! # Backends
//!
//! - [`documents::PgDocumentStore`] - `PostgreSQL` table `storefront.document`
//! - [`memory::MemoryDocumentStore`] - In-process store for tests and local runs
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shopfront-cli -- migrate
//! ```

pub mod documents;
pub mod memory;
pub mod paths;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shopfront_core::DocumentId;

pub use documents::PgDocumentStore;
pub use memory::MemoryDocumentStore;

/// JSON object body of a document.
pub type JsonMap = serde_json::Map<String, Value>;

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A document body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data in the store is corrupted or has an unexpected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested document was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A path segment was empty or contained a slash.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Paths
// =============================================================================

fn validate_segment(segment: &str) -> Result<(), RepositoryError> {
    if segment.is_empty() || segment.contains('/') {
        return Err(RepositoryError::InvalidPath(format!(
            "segment {segment:?} must be non-empty and must not contain '/'"
        )));
    }
    Ok(())
}

/// Path of a collection: an odd number of segments (`a`, `a/b/c`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Create a top-level collection path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if the name is not a valid segment.
    pub fn root(name: &str) -> Result<Self, RepositoryError> {
        validate_segment(name)?;
        Ok(Self(name.to_owned()))
    }

    /// Path of the document `id` inside this collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `id` is not a valid segment.
    pub fn doc(&self, id: &str) -> Result<DocumentPath, RepositoryError> {
        validate_segment(id)?;
        Ok(DocumentPath(format!("{}/{id}", self.0)))
    }

    /// The full path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a document: an even number of segments (`a/b`, `a/b/c/d`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse a full document path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if a segment is empty or the
    /// path has an odd number of segments.
    pub fn parse(path: &str) -> Result<Self, RepositoryError> {
        let segments: Vec<&str> = path.split('/').collect();
        for segment in &segments {
            validate_segment(segment)?;
        }
        if segments.len() % 2 != 0 {
            return Err(RepositoryError::InvalidPath(format!(
                "{path} names a collection, not a document"
            )));
        }
        Ok(Self(path.to_owned()))
    }

    /// Sub-collection `name` under this document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidPath` if `name` is not a valid segment.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, RepositoryError> {
        validate_segment(name)?;
        Ok(CollectionPath(format!("{}/{name}", self.0)))
    }

    /// The collection containing this document.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        let (parent, _) = self.split();
        CollectionPath(parent.to_owned())
    }

    /// The last segment: this document's id within its collection.
    #[must_use]
    pub fn id(&self) -> &str {
        let (_, id) = self.split();
        id
    }

    /// The full path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        // Always at least two segments, so rsplit_once cannot miss.
        self.0.rsplit_once('/').unwrap_or(("", &self.0))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A stored document: its id within the collection plus its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: JsonMap,
}

impl Document {
    /// Decode the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RepositoryError> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            RepositoryError::DataCorruption(format!("document {}: {e}", self.id))
        })
    }

    /// Decode the body into `T` with the document id injected as `"id"`.
    ///
    /// The document id always wins over an `id` field stored in the body.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the body does not match `T`.
    pub fn decode_with_id<T: DeserializeOwned>(&self) -> Result<T, RepositoryError> {
        let mut data = self.data.clone();
        data.insert("id".to_owned(), Value::String(self.id.to_string()));
        serde_json::from_value(Value::Object(data)).map_err(|e| {
            RepositoryError::DataCorruption(format!("document {}: {e}", self.id))
        })
    }
}

/// Encode a serializable value as a document body.
///
/// # Errors
///
/// Returns `RepositoryError::Serialization` if encoding fails, or
/// `RepositoryError::DataCorruption` if `value` is not a JSON object.
pub fn to_document<T: serde::Serialize>(value: &T) -> Result<JsonMap, RepositoryError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::DataCorruption(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Remote document store.
///
/// The small surface the cart, profile and address services need. Missing
/// documents are a normal outcome (`None`, `false`), never an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, RepositoryError>;

    /// Create or fully overwrite a document.
    async fn set(&self, path: &DocumentPath, data: JsonMap) -> Result<(), RepositoryError>;

    /// Merge `fields` into an existing document.
    ///
    /// Returns `false` (and writes nothing) if the document does not exist.
    async fn update(&self, path: &DocumentPath, fields: JsonMap) -> Result<bool, RepositoryError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &DocumentPath) -> Result<(), RepositoryError>;

    /// Create a document with a generated id.
    async fn add(
        &self,
        collection: &CollectionPath,
        data: JsonMap,
    ) -> Result<DocumentId, RepositoryError>;

    /// List every document directly inside a collection, ordered by id.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, RepositoryError>;

    /// List documents in a collection whose `field` equals `value`.
    async fn find_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, RepositoryError>;

    /// Atomically add `delta` to the integer `field`, clamped to `max`.
    ///
    /// If the document is missing it is created from `seed` with `field`
    /// set to `min(delta, max)`. Returns the field's new value.
    async fn increment(
        &self,
        path: &DocumentPath,
        field: &str,
        delta: i64,
        max: i64,
        seed: JsonMap,
    ) -> Result<i64, RepositoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
