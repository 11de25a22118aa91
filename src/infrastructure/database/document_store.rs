//! JSONB document store.
//!
//! Every collection is a set of `(collection, id) -> doc` rows in the
//! `documents` table. The store offers point reads, containment queries,
//! whole-document writes and single-key patches. Patches go through
//! `jsonb_set` inside one UPDATE, so two writers touching different keys of
//! the same map never overwrite each other.

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const CHATS: &str = "chats";
    pub const MESSAGES: &str = "messages";
    pub const GROUPS: &str = "groups";
    pub const CALLS: &str = "calls";
}

/// Typed access to the `documents` table.
#[derive(Clone)]
pub struct DocumentStore {
    pool: PgPool,
}

fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, AppError> {
    Ok(serde_json::from_value(doc)?)
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, AppError> {
    docs.into_iter().map(decode).collect()
}

fn path(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

impl DocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn observe(operation: &str, collection: &str, started: Instant) {
        metrics::record_store_operation(operation, collection, started.elapsed().as_secs_f64());
    }

    /// Read one document.
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        let started = Instant::now();
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Self::observe("get", collection, started);

        doc.map(decode).transpose()
    }

    /// Read several documents by id, in creation order.
    pub async fn get_many<T: DeserializeOwned>(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<T>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM documents
            WHERE collection = $1 AND id = ANY($2)
            ORDER BY created_at, id
            "#,
        )
        .bind(collection)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Self::observe("get_many", collection, started);

        decode_all(docs)
    }

    /// Documents containing `filter` (JSONB `@>`), in creation order.
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Value,
    ) -> Result<Vec<T>, AppError> {
        let started = Instant::now();
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM documents
            WHERE collection = $1 AND doc @> $2
            ORDER BY created_at, id
            "#,
        )
        .bind(collection)
        .bind(filter)
        .fetch_all(&self.pool)
        .await?;
        Self::observe("find", collection, started);

        decode_all(docs)
    }

    /// Documents whose object at `object_path` has the key `key`.
    pub async fn find_with_key<T: DeserializeOwned>(
        &self,
        collection: &str,
        object_path: &[&str],
        key: &str,
    ) -> Result<Vec<T>, AppError> {
        let started = Instant::now();
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM documents
            WHERE collection = $1 AND (doc #> $2::text[]) ? $3
            ORDER BY created_at, id
            "#,
        )
        .bind(collection)
        .bind(path(object_path))
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        Self::observe("find_with_key", collection, started);

        decode_all(docs)
    }

    /// Case-insensitive substring match on one top-level string field.
    pub async fn search<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<T>, AppError> {
        let pattern = format!(
            "%{}%",
            query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );

        let started = Instant::now();
        let docs = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT doc FROM documents
            WHERE collection = $1 AND (doc ->> $2) ILIKE $3
            ORDER BY doc ->> $2, id
            LIMIT $4
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Self::observe("search", collection, started);

        decode_all(docs)
    }

    /// Insert a new document.
    pub async fn insert<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        document: &T,
    ) -> Result<(), AppError> {
        let doc = serde_json::to_value(document)?;

        let started = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Self::observe("insert", collection, started);

        if result.rows_affected() == 0 {
            return Err(AppError::bad_request(format!(
                "Document {}/{} already exists",
                collection, id
            )));
        }
        Ok(())
    }

    /// Overwrite a whole document.
    pub async fn replace<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        document: &T,
    ) -> Result<(), AppError> {
        let doc = serde_json::to_value(document)?;

        let started = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE documents SET doc = $3
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Self::observe("replace", collection, started);

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("{} {} not found", collection, id)));
        }
        Ok(())
    }

    /// Set the value at `key_path`, creating the last key if missing.
    pub async fn set_key<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        key_path: &[&str],
        value: Value,
    ) -> Result<T, AppError> {
        let started = Instant::now();
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents SET doc = jsonb_set(doc, $3::text[], $4, true)
            WHERE collection = $1 AND id = $2
            RETURNING doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(path(key_path))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        Self::observe("set_key", collection, started);

        let doc = doc.ok_or_else(|| AppError::not_found(format!("{} {} not found", collection, id)))?;
        decode(doc)
    }

    /// Set the value at `key_path` only when nothing is stored there yet.
    ///
    /// Returns `None` when the key was already present; the check and the
    /// write are one statement.
    pub async fn set_key_if_absent<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        key_path: &[&str],
        value: Value,
    ) -> Result<Option<T>, AppError> {
        let started = Instant::now();
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents SET doc = jsonb_set(doc, $3::text[], $4, true)
            WHERE collection = $1 AND id = $2 AND (doc #> $3::text[]) IS NULL
            RETURNING doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(path(key_path))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        Self::observe("set_key_if_absent", collection, started);

        doc.map(decode).transpose()
    }

    /// Remove the key at `key_path`.
    pub async fn remove_key<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        key_path: &[&str],
    ) -> Result<T, AppError> {
        let started = Instant::now();
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents SET doc = doc #- $3::text[]
            WHERE collection = $1 AND id = $2
            RETURNING doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(path(key_path))
        .fetch_optional(&self.pool)
        .await?;
        Self::observe("remove_key", collection, started);

        let doc = doc.ok_or_else(|| AppError::not_found(format!("{} {} not found", collection, id)))?;
        decode(doc)
    }

    /// Add the entries of `entries` to the object at `object_path`, keeping
    /// entries already stored under the same keys.
    pub async fn merge_missing<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        object_path: &[&str],
        entries: Value,
    ) -> Result<T, AppError> {
        let started = Instant::now();
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents
            SET doc = jsonb_set(
                doc,
                $3::text[],
                $4 || COALESCE(doc #> $3::text[], '{}'::jsonb),
                true
            )
            WHERE collection = $1 AND id = $2
            RETURNING doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(path(object_path))
        .bind(entries)
        .fetch_optional(&self.pool)
        .await?;
        Self::observe("merge_missing", collection, started);

        let doc = doc.ok_or_else(|| AppError::not_found(format!("{} {} not found", collection, id)))?;
        decode(doc)
    }

    /// Overwrite top-level fields with those of `patch`.
    pub async fn merge_fields<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<T, AppError> {
        let started = Instant::now();
        let doc = sqlx::query_scalar::<_, Value>(
            r#"
            UPDATE documents SET doc = doc || $3
            WHERE collection = $1 AND id = $2
            RETURNING doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(patch)
        .fetch_optional(&self.pool)
        .await?;
        Self::observe("merge_fields", collection, started);

        let doc = doc.ok_or_else(|| AppError::not_found(format!("{} {} not found", collection, id)))?;
        decode(doc)
    }

    /// Cheap connectivity probe for readiness checks.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
