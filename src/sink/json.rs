//! Single-file JSON vector store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::Chunk;

use super::flat::flat_search;
use super::{check_vectors, Metric, SearchHits, SinkError, SinkItem, VectorSink};

const INDEX_NAME: &str = "rag-index";

#[derive(Debug, Serialize, Deserialize)]
struct IndexMeta {
    name: String,
    dim: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredItem {
    #[serde(flatten)]
    item: SinkItem,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexDocument {
    meta: IndexMeta,
    #[serde(default)]
    items: Vec<StoredItem>,
}

/// Items and vectors in one `{meta, items}` document, searched with L2.
pub struct JsonVectorSink {
    path: PathBuf,
    dim: Option<usize>,
    items: Vec<SinkItem>,
    vectors: Vec<Vec<f32>>,
}

impl JsonVectorSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let doc: Option<IndexDocument> = match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => None,
            Ok(s) => Some(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut sink = Self {
            path,
            dim: None,
            items: Vec::new(),
            vectors: Vec::new(),
        };
        if let Some(doc) = doc {
            sink.dim = doc.meta.dim;
            for stored in doc.items {
                sink.items.push(stored.item);
                sink.vectors.push(stored.vector);
            }
        }
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let doc = IndexDocument {
            meta: IndexMeta {
                name: INDEX_NAME.to_string(),
                dim: self.dim,
            },
            items: self
                .items
                .iter()
                .zip(&self.vectors)
                .map(|(item, vector)| StoredItem {
                    item: item.clone(),
                    vector: vector.clone(),
                })
                .collect(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }
}

impl VectorSink for JsonVectorSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn upsert(&mut self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize, SinkError> {
        self.dim = check_vectors(chunks, vectors, self.dim)?;
        self.items.extend(chunks.iter().map(SinkItem::from_chunk));
        self.vectors.extend(vectors.iter().cloned());
        self.save()?;
        tracing::info!(
            "json index {}: +{} items ({} total)",
            self.path.display(),
            chunks.len(),
            self.items.len()
        );
        Ok(chunks.len())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<SearchHits, SinkError> {
        if let Some(expected) = self.dim {
            if expected != query.len() {
                return Err(SinkError::DimensionMismatch {
                    expected,
                    got: query.len(),
                });
            }
        }
        Ok(flat_search(&self.vectors, query, k, Metric::L2))
    }

    fn items(&self) -> &[SinkItem] {
        &self.items
    }

    fn dim(&self) -> Option<usize> {
        self.dim
    }

    fn metric(&self) -> Metric {
        Metric::L2
    }
}
