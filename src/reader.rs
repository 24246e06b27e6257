//! Filesystem document loading.
//!
//! Walks a directory tree, keeps files whose extension is in the
//! requested set, and turns each into a [`Document`] with stable
//! identity and source metadata. Files whose text cannot be extracted
//! are skipped with a warning rather than failing the whole load.

use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::RagError;
use crate::extract;
use crate::models::{Document, DocumentMetadata};
use crate::normalize;

/// Derives a stable document id from the file path. Re-ingesting the
/// same path yields the same id, so its chunks overwrite instead of
/// accumulating.
pub fn document_id(file_path: &str) -> String {
    let digest = Sha256::digest(file_path.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Loads every matching file under `dir` (recursively) as a document.
/// Extension comparison is case-insensitive. Paths are visited in
/// sorted order so repeated loads produce the same document sequence.
pub fn load_documents(dir: &Path, extensions: &[String]) -> Result<Vec<Document>, RagError> {
    let wanted: Vec<String> = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry
            .map_err(|e| RagError::SourceUnavailable(format!("cannot walk {:?}: {}", dir, e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if wanted.contains(&ext) {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let raw_text = match extract::extract_text(&path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("warning: skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let file_path = path.display().to_string();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        documents.push(Document {
            id: document_id(&file_path),
            raw_text,
            metadata: DocumentMetadata {
                file_name,
                source_type: normalize::classify(&file_path),
                file_path,
            },
        });
    }

    if documents.is_empty() {
        return Err(RagError::NoDocumentsFound {
            dir: dir.display().to_string(),
            extensions: wanted,
        });
    }
    Ok(documents)
}
