//! Index snapshot export.
//!
//! Serializes a summary of the persisted collection to
//! `index_snapshot.json`: one record per stored chunk, identified by
//! id and a content hash rather than the raw text, so snapshots from
//! two machines can be diffed without shipping corpus content.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::RagError;
use crate::store::Collection;

pub const SNAPSHOT_FILE_NAME: &str = "index_snapshot.json";

#[derive(Debug, Serialize)]
pub struct IndexSnapshot {
    pub collection: String,
    pub dims: Option<usize>,
    pub entry_count: u64,
    pub generated_at: String,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotEntry {
    pub id: String,
    /// sha256 of the stored chunk text, hex-encoded.
    pub content_hash: String,
}

fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Builds a snapshot of `collection` in insertion order.
pub async fn build_snapshot(collection: &Collection) -> Result<IndexSnapshot, RagError> {
    let entries = collection
        .list_entries()
        .await?
        .into_iter()
        .map(|(id, text)| SnapshotEntry {
            id,
            content_hash: content_hash(&text),
        })
        .collect::<Vec<_>>();
    Ok(IndexSnapshot {
        collection: collection.name().to_string(),
        dims: collection.dims().await?,
        entry_count: entries.len() as u64,
        generated_at: Utc::now().to_rfc3339(),
        entries,
    })
}

/// Writes the snapshot as pretty JSON under `dir`, returning the path
/// of the written file.
pub async fn write_snapshot(collection: &Collection, dir: &Path) -> Result<PathBuf, RagError> {
    let snapshot = build_snapshot(collection).await?;
    std::fs::create_dir_all(dir).map_err(|e| RagError::StoreUnavailable(e.to_string()))?;
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| RagError::StoreUnavailable(e.to_string()))?;
    let path = dir.join(SNAPSHOT_FILE_NAME);
    std::fs::write(&path, json).map_err(|e| RagError::StoreUnavailable(e.to_string()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntryWrite, VectorStore};

    async fn seeded_collection(dir: &Path) -> Collection {
        let store = VectorStore::open(&dir.join("index.db")).await.unwrap();
        let collection = store.get_or_create_collection("snap_test").await.unwrap();
        let entries = vec![
            EntryWrite {
                id: "d0:0".to_string(),
                vector: vec![1.0, 0.0],
                text: "first chunk".to_string(),
                metadata: serde_json::json!({}),
            },
            EntryWrite {
                id: "d0:1".to_string(),
                vector: vec![0.0, 1.0],
                text: "second chunk".to_string(),
                metadata: serde_json::json!({}),
            },
        ];
        collection.add_batch(&entries).await.unwrap();
        collection
    }

    #[tokio::test]
    async fn snapshot_lists_entries_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let collection = seeded_collection(dir.path()).await;

        let snapshot = build_snapshot(&collection).await.unwrap();
        assert_eq!(snapshot.collection, "snap_test");
        assert_eq!(snapshot.dims, Some(2));
        assert_eq!(snapshot.entry_count, 2);
        assert_eq!(snapshot.entries[0].id, "d0:0");
        assert_eq!(snapshot.entries[1].id, "d0:1");
        assert_eq!(snapshot.entries[0].content_hash.len(), 64);
    }

    #[tokio::test]
    async fn identical_text_hashes_identically() {
        assert_eq!(content_hash("same"), content_hash("same"));
        assert_ne!(content_hash("same"), content_hash("different"));
    }

    #[tokio::test]
    async fn write_snapshot_produces_valid_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let collection = seeded_collection(dir.path()).await;

        let out_dir = dir.path().join("out");
        let path = write_snapshot(&collection, &out_dir).await.unwrap();
        assert_eq!(path.file_name().unwrap(), SNAPSHOT_FILE_NAME);

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["entry_count"], 2);
        assert_eq!(parsed["entries"][0]["id"], "d0:0");
    }
}
