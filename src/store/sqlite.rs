//! SQLite-backed [`VectorStore`].
//!
//! An index location is a directory holding one `index.sqlite` database;
//! collections are rows tagged with their collection name. Vectors are
//! stored as little-endian `f32` BLOBs and scored in Rust at query time.
//!
//! `rebuild` deletes the whole directory before recreating it. Two
//! processes that rebuild the same directory concurrently can destroy each
//! other's index mid-flight; nothing here guards against that.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Chunk, ChunkMetadata, IndexEntry, IndexLocation, RetrievalResult};

use super::{rank_top_k, VectorStore};

const DB_FILE: &str = "index.sqlite";

/// SQLite implementation of the [`VectorStore`] trait.
///
/// Holds no open connection: each call opens a small pool on the
/// location's database and closes it before returning.
#[derive(Debug, Default, Clone)]
pub struct SqliteVectorStore;

impl SqliteVectorStore {
    pub fn new() -> Self {
        Self
    }
}

fn db_path(location: &IndexLocation) -> PathBuf {
    location.path.join(DB_FILE)
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    if !create && !path.exists() {
        return Err(anyhow!(
            "no index found at {}; start a session to build it",
            path.display()
        ));
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database {}", path.display()))?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            chunk_id TEXT NOT NULL,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            start_offset INTEGER NOT NULL,
            end_offset INTEGER NOT NULL,
            ticker TEXT,
            link TEXT,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            UNIQUE(collection, chunk_id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn ensure_collection(pool: &SqlitePool, location: &IndexLocation) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
            .bind(&location.collection)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(anyhow!(
            "collection {} does not exist; rebuild it first",
            location
        ));
    }
    Ok(())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn rebuild(&self, location: &IndexLocation) -> Result<()> {
        if location.path.exists() {
            std::fs::remove_dir_all(&location.path).with_context(|| {
                format!("Failed to remove index directory {}", location.path.display())
            })?;
        }
        std::fs::create_dir_all(&location.path).with_context(|| {
            format!("Failed to create index directory {}", location.path.display())
        })?;

        let pool = connect(&db_path(location), true).await?;
        run_migrations(&pool).await?;
        sqlx::query("INSERT INTO collections (name, created_at) VALUES (?, ?)")
            .bind(&location.collection)
            .bind(chrono::Utc::now().timestamp())
            .execute(&pool)
            .await?;
        pool.close().await;

        tracing::debug!(%location, "index rebuilt");
        Ok(())
    }

    async fn insert(&self, location: &IndexLocation, entries: &[IndexEntry]) -> Result<usize> {
        let pool = connect(&db_path(location), false).await?;
        ensure_collection(&pool, location).await?;

        let mut tx = pool.begin().await?;
        for entry in entries {
            let chunk = &entry.chunk;
            sqlx::query(
                r#"
                INSERT INTO entries (collection, chunk_id, document_id, chunk_index, text, hash,
                                     start_offset, end_offset, ticker, link, dims, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&location.collection)
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(chunk.start as i64)
            .bind(chunk.end as i64)
            .bind(&chunk.metadata.ticker)
            .bind(&chunk.metadata.link)
            .bind(entry.embedding.len() as i64)
            .bind(vec_to_blob(&entry.embedding))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert chunk {}", chunk.id))?;
        }
        tx.commit().await?;
        pool.close().await;

        Ok(entries.len())
    }

    async fn search(
        &self,
        location: &IndexLocation,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let pool = connect(&db_path(location), false).await?;
        ensure_collection(&pool, location).await?;

        let rows = sqlx::query(
            r#"
            SELECT chunk_id, document_id, chunk_index, text, hash,
                   start_offset, end_offset, ticker, link, embedding
            FROM entries
            WHERE collection = ?
            ORDER BY seq
            "#,
        )
        .bind(&location.collection)
        .fetch_all(&pool)
        .await?;
        pool.close().await;

        let mut results: Vec<RetrievalResult> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(query_vec, &blob_to_vec(&blob)) as f64;
                let start: i64 = row.get("start_offset");
                let end: i64 = row.get("end_offset");
                RetrievalResult {
                    chunk: Chunk {
                        id: row.get("chunk_id"),
                        document_id: row.get("document_id"),
                        chunk_index: row.get("chunk_index"),
                        text: row.get("text"),
                        hash: row.get("hash"),
                        start: start as usize,
                        end: end as usize,
                        metadata: ChunkMetadata {
                            ticker: row.get("ticker"),
                            link: row.get("link"),
                        },
                    },
                    score,
                }
            })
            .collect();

        rank_top_k(&mut results, k);
        Ok(results)
    }

    async fn count(&self, location: &IndexLocation) -> Result<usize> {
        let path = db_path(location);
        if !path.exists() {
            return Ok(0);
        }
        let pool = connect(&path, false).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(&location.collection)
            .fetch_one(&pool)
            .await?;
        pool.close().await;
        Ok(count as usize)
    }
}
