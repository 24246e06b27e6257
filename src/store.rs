//! Persistent vector collection store backed by SQLite.
//!
//! A store file holds named collections of `(id, vector, text, metadata)`
//! entries. Vectors are little-endian f32 BLOBs; similarity queries load
//! the collection's vectors and rank by cosine similarity in Rust, with
//! ties broken by ascending insertion sequence for determinism.
//!
//! A collection's dimensionality is established by the first successful
//! `add`; later writes and queries with a different vector length fail
//! with [`RagError::DimensionMismatch`]. Entries are inserted or overwritten
//! wholesale — partial updates are not supported.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::RagError;

/// Handle to a store file. Collections are created lazily by name.
pub struct VectorStore {
    pool: SqlitePool,
}

/// An entry staged for a batch write.
pub struct EntryWrite {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// A ranked result from [`Collection::query_by_vector`].
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Value,
    pub score: f32,
}

impl VectorStore {
    /// Open (or create) the store at `path` and run schema migrations.
    pub async fn open(path: &Path) -> Result<Self, RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RagError::StoreUnavailable(e.to_string()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| RagError::StoreUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Get-or-create semantics: the same name always yields a collection
    /// whose prior contents are preserved.
    pub async fn get_or_create_collection(&self, name: &str) -> Result<Collection, RagError> {
        sqlx::query("INSERT OR IGNORE INTO collections (name, dims) VALUES (?, NULL)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(Collection {
            pool: self.pool.clone(),
            name: name.to_string(),
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), RagError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            dims INTEGER
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
            id TEXT NOT NULL,
            text TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            embedding BLOB NOT NULL,
            UNIQUE(collection, id),
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

/// A named collection within an open store.
#[derive(Clone)]
pub struct Collection {
    pool: SqlitePool,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dimensionality established by the first successful `add`, or
    /// `None` while the collection is still empty.
    pub async fn dims(&self) -> Result<Option<usize>, RagError> {
        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM collections WHERE name = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(dims.map(|d| d as usize))
    }

    pub async fn count(&self) -> Result<u64, RagError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    /// Insert or overwrite the entry at `id` wholesale. The overwrite
    /// keeps the entry's original insertion sequence.
    pub async fn add(
        &self,
        id: &str,
        vector: &[f32],
        text: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), RagError> {
        let entry = EntryWrite {
            id: id.to_string(),
            vector: vector.to_vec(),
            text: text.to_string(),
            metadata: metadata.clone(),
        };
        self.add_batch(std::slice::from_ref(&entry)).await
    }

    /// Write a batch of entries in one transaction, so a mid-batch
    /// failure leaves the collection untouched.
    pub async fn add_batch(&self, entries: &[EntryWrite]) -> Result<(), RagError> {
        let Some(first) = entries.first() else {
            return Ok(());
        };

        let dims = first.vector.len();
        for entry in entries {
            if entry.vector.len() != dims {
                return Err(RagError::DimensionMismatch {
                    expected: dims,
                    actual: entry.vector.len(),
                });
            }
        }
        if let Some(expected) = self.dims().await? {
            if expected != dims {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: dims,
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE collections SET dims = ? WHERE name = ? AND dims IS NULL")
            .bind(dims as i64)
            .bind(&self.name)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, text, metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    text = excluded.text,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&self.name)
            .bind(&entry.id)
            .bind(&entry.text)
            .bind(entry.metadata.to_string())
            .bind(vec_to_blob(&entry.vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Return up to `k` entries ranked by cosine similarity to `vector`
    /// (descending), ties broken by insertion sequence ascending. An
    /// empty collection yields an empty vec; a query vector that does
    /// not match the collection's established dimensionality is an
    /// error, same as on the write path.
    pub async fn query_by_vector(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredEntry>, RagError> {
        if let Some(expected) = self.dims().await? {
            if expected != vector.len() {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let rows = sqlx::query(
            "SELECT id, text, metadata_json, embedding, seq FROM entries WHERE collection = ?",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(ScoredEntry, i64)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let metadata_json: String = row.get("metadata_json");
                let entry = ScoredEntry {
                    id: row.get("id"),
                    text: row.get("text"),
                    metadata: serde_json::from_str(&metadata_json)
                        .unwrap_or(serde_json::Value::Null),
                    score: cosine_similarity(vector, &blob_to_vec(&blob)),
                };
                (entry, row.get::<i64, _>("seq"))
            })
            .collect();

        scored.sort_by(|(a, a_seq), (b, b_seq)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a_seq.cmp(b_seq))
        });
        scored.truncate(k);

        Ok(scored.into_iter().map(|(entry, _)| entry).collect())
    }

    /// All entry ids and texts in insertion order, for snapshotting.
    pub async fn list_entries(&self) -> Result<Vec<(String, String)>, RagError> {
        let rows =
            sqlx::query("SELECT id, text FROM entries WHERE collection = ? ORDER BY seq ASC")
                .bind(&self.name)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("text")))
            .collect())
    }
}
