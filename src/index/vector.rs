// src/index/vector.rs
// Per-project semantic chunk store, persisted under `<project>/.rag_db/`.
// The unit of indexing is a top-level Python function or class; files the
// parser rejects fall back to sliding-window text chunks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::chunking::sliding_window_chunks;
use super::embedding::{cosine_distance, embed};
use crate::pycode;
use crate::workspace::project::{relative_display, EXCLUDED_DIRS};

const RAG_DB_DIR: &str = ".rag_db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub node_type: String,
    pub node_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorChunk {
    id: String,
    document: String,
    metadata: ChunkMetadata,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct QueryHit {
    pub document: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    chunks: Vec<VectorChunk>,
}

/// The per-project vector index. Namespaced per (user, project); mutations
/// persist to disk before returning so a fresh session sees the same store.
pub struct VectorIndex {
    project_root: PathBuf,
    collection: String,
    store_path: PathBuf,
    entries: RwLock<HashMap<String, VectorChunk>>,
}

fn sanitize(name: &str) -> String {
    name.replace([' ', '.'], "_")
}

impl VectorIndex {
    /// Loads or creates the vector store for a project.
    pub fn open(project_root: &Path, user_id: i64) -> Result<Self> {
        let project_name = project_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let collection = format!("aura_project_{}_{}", user_id, sanitize(&project_name));
        let store_path = project_root
            .join(RAG_DB_DIR)
            .join(format!("{}.json", collection));

        let mut entries = HashMap::new();
        if store_path.exists() {
            let raw = std::fs::read_to_string(&store_path)
                .with_context(|| format!("failed to read vector store {}", store_path.display()))?;
            match serde_json::from_str::<CollectionFile>(&raw) {
                Ok(file) => {
                    for chunk in file.chunks {
                        entries.insert(chunk.id.clone(), chunk);
                    }
                }
                Err(e) => warn!("Corrupt vector store at {}: {}. Starting empty.", store_path.display(), e),
            }
        }

        info!(
            "Vector store loaded. Collection '{}' has {} items.",
            collection,
            entries.len()
        );
        Ok(Self {
            project_root: project_root.to_path_buf(),
            collection,
            store_path,
            entries: RwLock::new(entries),
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn persist(&self) -> Result<()> {
        let chunks: Vec<VectorChunk> = {
            let entries = self.entries.read().await;
            let mut chunks: Vec<VectorChunk> = entries.values().cloned().collect();
            chunks.sort_by(|a, b| a.id.cmp(&b.id));
            chunks
        };
        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(&CollectionFile { chunks })?;
        std::fs::write(&self.store_path, raw)
            .with_context(|| format!("failed to persist vector store {}", self.store_path.display()))?;
        Ok(())
    }

    /// Id-based collision-safe upsert.
    pub async fn upsert(&self, documents: Vec<(String, ChunkMetadata)>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        {
            let mut entries = self.entries.write().await;
            for (document, metadata) in documents {
                let id = format!(
                    "{}-{}-{}",
                    metadata.file_path, metadata.node_type, metadata.node_name
                );
                let embedding = embed(&document);
                entries.insert(
                    id.clone(),
                    VectorChunk {
                        id,
                        document,
                        metadata,
                        embedding,
                    },
                );
            }
        }
        self.persist().await
    }

    /// Top-k chunks by cosine distance to the query text.
    pub async fn query(&self, text: &str, k: usize) -> Vec<QueryHit> {
        let query = embed(text);
        let entries = self.entries.read().await;
        let mut hits: Vec<QueryHit> = entries
            .values()
            .map(|chunk| QueryHit {
                document: chunk.document.clone(),
                metadata: chunk.metadata.clone(),
                distance: cosine_distance(&query, &chunk.embedding),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }

    /// Drops every chunk attributed to `path`, then re-inserts from a fresh
    /// parse of `content`. Non-parseable files get fallback text chunks.
    pub async fn reindex_file(&self, path: &Path, content: &str) -> Result<()> {
        let relative = relative_display(&self.project_root, path);
        debug!("Re-indexing file: {}", relative);

        {
            let mut entries = self.entries.write().await;
            entries.retain(|_, chunk| chunk.metadata.file_path != relative);
        }

        let documents = extract_documents(&relative, content);
        if documents.is_empty() {
            self.persist().await?;
            debug!("No functions or classes found in {}. Nothing new to index.", relative);
            return Ok(());
        }
        self.upsert(documents).await
    }

    /// Drops the collection and rebuilds it from a full project walk.
    pub async fn reindex_project(&self) -> Result<()> {
        info!("Starting full re-index of project: {}", self.project_root.display());
        self.entries.write().await.clear();

        let files: Vec<PathBuf> = WalkDir::new(&self.project_root)
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir() && EXCLUDED_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();

        for file in files {
            match std::fs::read_to_string(&file) {
                Ok(content) => {
                    if let Err(e) = self.reindex_file(&file, &content).await {
                        warn!("Could not index {}: {}", file.display(), e);
                    }
                }
                Err(e) => debug!("Skipping unreadable file {}: {}", file.display(), e),
            }
        }

        info!(
            "Full project re-index complete. Collection now has {} items.",
            self.count().await
        );
        Ok(())
    }
}

/// Extract indexable documents from one file: top-level defs when the file
/// parses, sliding-window text chunks otherwise.
fn extract_documents(relative: &str, content: &str) -> Vec<(String, ChunkMetadata)> {
    if relative.ends_with(".py") && pycode::is_valid(content) {
        match pycode::top_level_defs(content) {
            Ok(defs) => defs
                .into_iter()
                .map(|def| {
                    (
                        content[def.start_byte..def.end_byte].to_string(),
                        ChunkMetadata {
                            file_path: relative.to_string(),
                            node_type: def.kind.as_str().to_string(),
                            node_name: def.name,
                        },
                    )
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    } else {
        sliding_window_chunks(content)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                (
                    chunk,
                    ChunkMetadata {
                        file_path: relative.to_string(),
                        node_type: "text_chunk".to_string(),
                        node_name: format!("chunk_{}", i),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::project::write_file;

    fn index(dir: &Path) -> VectorIndex {
        VectorIndex::open(dir, 1).unwrap()
    }

    #[tokio::test]
    async fn reindex_file_extracts_defs_and_upserts() {
        let dir = tempfile::tempdir().unwrap();
        let idx = index(dir.path());

        let code = "def read_contacts(db):\n    return db.all()\n\n\nclass ContactStore:\n    pass\n";
        idx.reindex_file(&dir.path().join("store.py"), code).await.unwrap();
        assert_eq!(idx.count().await, 2);

        // Re-indexing the same content leaves the index identical.
        idx.reindex_file(&dir.path().join("store.py"), code).await.unwrap();
        assert_eq!(idx.count().await, 2);

        let hits = idx.query("read contacts from the database", 5).await;
        assert_eq!(hits[0].metadata.node_name, "read_contacts");
        assert_eq!(hits[0].metadata.node_type, "function");
    }

    #[tokio::test]
    async fn old_chunks_are_dropped_on_reindex() {
        let dir = tempfile::tempdir().unwrap();
        let idx = index(dir.path());
        let path = dir.path().join("api.py");

        idx.reindex_file(&path, "def old_handler():\n    pass\n").await.unwrap();
        idx.reindex_file(&path, "def new_handler():\n    pass\n").await.unwrap();

        assert_eq!(idx.count().await, 1);
        let hits = idx.query("handler", 5).await;
        assert_eq!(hits[0].metadata.node_name, "new_handler");
    }

    #[tokio::test]
    async fn unparseable_files_fall_back_to_text_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let idx = index(dir.path());

        idx.reindex_file(&dir.path().join("notes.py"), "def broken(:\n  nope\n")
            .await
            .unwrap();
        let hits = idx.query("broken", 5).await;
        assert!(!hits.is_empty());
        assert_eq!(hits[0].metadata.node_type, "text_chunk");
    }

    #[tokio::test]
    async fn store_persists_across_open_calls() {
        let dir = tempfile::tempdir().unwrap();
        {
            let idx = index(dir.path());
            idx.reindex_file(&dir.path().join("m.py"), "def persisted():\n    pass\n")
                .await
                .unwrap();
        }
        let idx = index(dir.path());
        assert_eq!(idx.count().await, 1);
    }

    #[tokio::test]
    async fn project_reindex_walks_and_skips_internal_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.py", "def alpha():\n    pass\n").unwrap();
        write_file(dir.path(), "pkg/b.py", "class Beta:\n    pass\n").unwrap();
        write_file(dir.path(), ".venv/lib.py", "def hidden():\n    pass\n").unwrap();

        let idx = index(dir.path());
        idx.reindex_project().await.unwrap();

        let hits = idx.query("alpha", 10).await;
        assert!(hits.iter().any(|h| h.metadata.file_path == "a.py"));
        assert!(!hits.iter().any(|h| h.metadata.file_path.starts_with(".venv")));
    }
}
