use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::debug;

use shared::domain::DocumentRef;

pub const DEFAULT_PAGE_SIZE: u32 = 64;
pub const MAX_PAGE_SIZE: u32 = 100_000;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub doc_ref: DocumentRef,
    pub collection: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIndex {
    pub name: String,
    pub source_collection: String,
}

/// One page of an index match. `after` is the first ref of the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub after: Option<DocumentRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub size: u32,
    pub after: Option<DocumentRef>,
}

impl PageRequest {
    pub fn first(size: u32) -> Self {
        Self { size, after: None }
    }

    pub fn starting_at(self, after: DocumentRef) -> Self {
        Self {
            size: self.size,
            after: Some(after),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Error)]
#[error("index not found: {0}")]
pub struct IndexNotFound(pub String);

/// Read access to indexed documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn paginate_index(&self, index: &str, page: PageRequest) -> Result<Page<DocumentRef>>;

    async fn get_document(&self, doc_ref: DocumentRef) -> Result<Option<StoredDocument>>;
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Creates the index, or repoints an existing one at `source_collection`.
    pub async fn create_index(&self, name: &str, source_collection: &str) -> Result<StoredIndex> {
        if name.trim().is_empty() {
            bail!("index name must not be empty");
        }
        if source_collection.trim().is_empty() {
            bail!("source collection must not be empty");
        }
        sqlx::query(
            "INSERT INTO indexes (name, source_collection) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET source_collection=excluded.source_collection",
        )
        .bind(name)
        .bind(source_collection)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create index '{name}'"))?;
        debug!(index = name, collection = source_collection, "index ready");
        Ok(StoredIndex {
            name: name.to_string(),
            source_collection: source_collection.to_string(),
        })
    }

    pub async fn find_index(&self, name: &str) -> Result<Option<StoredIndex>> {
        let row = sqlx::query("SELECT name, source_collection FROM indexes WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| StoredIndex {
            name: r.get::<String, _>(0),
            source_collection: r.get::<String, _>(1),
        }))
    }

    pub async fn list_indexes(&self) -> Result<Vec<StoredIndex>> {
        let rows = sqlx::query("SELECT name, source_collection FROM indexes ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredIndex {
                name: r.get::<String, _>(0),
                source_collection: r.get::<String, _>(1),
            })
            .collect())
    }

    /// Stores `data` as a new document. Only JSON objects are accepted.
    pub async fn create_document(
        &self,
        collection: &str,
        data: &serde_json::Value,
    ) -> Result<DocumentRef> {
        if collection.trim().is_empty() {
            bail!("collection must not be empty");
        }
        if !data.is_object() {
            bail!("document data must be a JSON object");
        }
        let encoded = serde_json::to_string(data).context("failed to encode document data")?;
        let rec = sqlx::query("INSERT INTO documents (collection, data) VALUES (?, ?) RETURNING id")
            .bind(collection)
            .bind(encoded)
            .fetch_one(&self.pool)
            .await?;
        Ok(DocumentRef(rec.get::<i64, _>(0)))
    }

    async fn load_document(&self, doc_ref: DocumentRef) -> Result<Option<StoredDocument>> {
        let row = sqlx::query(
            "SELECT id, collection, data, created_at FROM documents WHERE id = ?",
        )
        .bind(doc_ref.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw_data = row.get::<String, _>(2);
        let data = serde_json::from_str(&raw_data)
            .with_context(|| format!("document {doc_ref} holds malformed JSON"))?;
        Ok(Some(StoredDocument {
            doc_ref: DocumentRef(row.get::<i64, _>(0)),
            collection: row.get::<String, _>(1),
            data,
            created_at: row.get::<DateTime<Utc>, _>(3),
        }))
    }

    async fn match_index_page(&self, index: &str, page: PageRequest) -> Result<Page<DocumentRef>> {
        if page.size == 0 || page.size > MAX_PAGE_SIZE {
            bail!("page size must be between 1 and {MAX_PAGE_SIZE}");
        }
        let stored = self
            .find_index(index)
            .await?
            .ok_or_else(|| IndexNotFound(index.to_string()))?;

        // One extra row tells us whether another page follows.
        let rows = sqlx::query(
            "SELECT id FROM documents
             WHERE collection = ? AND id >= ?
             ORDER BY id ASC
             LIMIT ?",
        )
        .bind(&stored.source_collection)
        .bind(page.after.map(|r| r.0).unwrap_or(i64::MIN))
        .bind(i64::from(page.size) + 1)
        .fetch_all(&self.pool)
        .await?;

        let mut data: Vec<DocumentRef> = rows
            .into_iter()
            .map(|r| DocumentRef(r.get::<i64, _>(0)))
            .collect();
        let after = if data.len() > page.size as usize {
            data.pop()
        } else {
            None
        };
        debug!(index, returned = data.len(), has_more = after.is_some(), "index page");
        Ok(Page { data, after })
    }
}

#[async_trait]
impl DocumentStore for Storage {
    async fn paginate_index(&self, index: &str, page: PageRequest) -> Result<Page<DocumentRef>> {
        self.match_index_page(index, page).await
    }

    async fn get_document(&self, doc_ref: DocumentRef) -> Result<Option<StoredDocument>> {
        self.load_document(doc_ref).await
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
