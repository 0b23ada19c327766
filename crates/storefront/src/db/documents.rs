//! `PostgreSQL` document store.
//!
//! Every document is one row of `storefront.document`, keyed by its full
//! path. `collection` and `doc_id` are denormalized from the path so that
//! collection listings are a single indexed scan.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use shopfront_core::DocumentId;

use super::{CollectionPath, Document, DocumentPath, DocumentStore, JsonMap, RepositoryError};

/// Row shape shared by all document queries.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    doc_id: String,
    data: Json<Value>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = RepositoryError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        match row.data.0 {
            Value::Object(data) => Ok(Self {
                id: DocumentId::new(row.doc_id),
                data,
            }),
            other => Err(RepositoryError::DataCorruption(format!(
                "document {} has non-object body: {other}",
                row.doc_id
            ))),
        }
    }
}

/// Document store backed by the `storefront.document` table.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a new document store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT doc_id, data
            FROM storefront.document
            WHERE path = $1
            ",
        )
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Document::try_from).transpose()
    }

    async fn set(&self, path: &DocumentPath, data: JsonMap) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.document (path, collection, doc_id, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (path) DO UPDATE
            SET data = EXCLUDED.data, updated_at = now()
            ",
        )
        .bind(path.as_str())
        .bind(path.parent().as_str())
        .bind(path.id())
        .bind(Json(Value::Object(data)))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: JsonMap) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.document
            SET data = data || $2, updated_at = now()
            WHERE path = $1
            ",
        )
        .bind(path.as_str())
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM storefront.document
            WHERE path = $1
            ",
        )
        .bind(path.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        data: JsonMap,
    ) -> Result<DocumentId, RepositoryError> {
        let id = Uuid::new_v4().simple().to_string();
        let path = collection.doc(&id)?;
        sqlx::query(
            r"
            INSERT INTO storefront.document (path, collection, doc_id, data)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(path.as_str())
        .bind(collection.as_str())
        .bind(&id)
        .bind(Json(Value::Object(data)))
        .execute(&self.pool)
        .await?;

        Ok(DocumentId::new(id))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT doc_id, data
            FROM storefront.document
            WHERE collection = $1
            ORDER BY doc_id
            ",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn find_eq(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT doc_id, data
            FROM storefront.document
            WHERE collection = $1 AND data -> $2::text = $3::jsonb
            ORDER BY doc_id
            ",
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn increment(
        &self,
        path: &DocumentPath,
        field: &str,
        delta: i64,
        max: i64,
        mut seed: JsonMap,
    ) -> Result<i64, RepositoryError> {
        seed.insert(field.to_owned(), Value::from(delta.min(max)));

        // Single statement: the row lock taken by ON CONFLICT serializes
        // concurrent increments of the same document.
        let value: i64 = sqlx::query_scalar(
            r"
            INSERT INTO storefront.document AS document (path, collection, doc_id, data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (path) DO UPDATE
            SET data = jsonb_set(
                    document.data,
                    ARRAY[$5::text],
                    to_jsonb(LEAST(
                        CASE WHEN jsonb_typeof(document.data -> $5::text) = 'number'
                             THEN (document.data ->> $5::text)::numeric
                             ELSE 0
                        END + $6::bigint,
                        $7::bigint
                    )::bigint)
                ),
                updated_at = now()
            RETURNING (data ->> $5::text)::bigint
            ",
        )
        .bind(path.as_str())
        .bind(path.parent().as_str())
        .bind(path.id())
        .bind(Json(Value::Object(seed)))
        .bind(field)
        .bind(delta)
        .bind(max)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
