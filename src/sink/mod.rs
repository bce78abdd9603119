//! Vector sinks: persisted chunk vectors plus an aligned metadata list.
//!
//! - `json`: one JSON document holding items and their vectors
//! - `flat`: exact flat index (L2 or inner product) with a metadata sidecar
//!
//! Search returns `(distances, indices)` where each index points into
//! [`VectorSink::items`].

mod flat;
mod json;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Chunk, ChunkMeta};

pub use flat::{flat_search, FlatVectorSink};
pub use json::JsonVectorSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Vector dimension mismatch: index has {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Got {chunks} chunks but {vectors} vectors")]
    CountMismatch { chunks: usize, vectors: usize },

    #[error("Unknown metric: {0} (expected L2 or IP)")]
    UnknownMetric(String),
}

/// Similarity measure of a flat index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Squared euclidean distance, lower is closer.
    #[default]
    L2,
    /// Inner product, higher is closer.
    IP,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::L2 => "L2",
            Metric::IP => "IP",
        }
    }

    pub fn parse(s: &str) -> Result<Self, SinkError> {
        match s.to_ascii_uppercase().as_str() {
            "L2" => Ok(Metric::L2),
            "IP" => Ok(Metric::IP),
            _ => Err(SinkError::UnknownMetric(s.to_string())),
        }
    }

    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Metric::IP => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        }
    }

    /// Whether a score is at least as close as `threshold`.
    pub fn passes(&self, score: f32, threshold: f32) -> bool {
        match self {
            Metric::L2 => score <= threshold,
            Metric::IP => score >= threshold,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata record stored for every indexed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkItem {
    pub id: String,
    pub chunk_id: String,
    pub text: String,
    pub meta: ChunkMeta,
}

impl SinkItem {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let doc_id = chunk.meta.doc_id.as_deref().unwrap_or("unknown");
        Self {
            id: item_id(doc_id, &chunk.id),
            chunk_id: chunk.id.clone(),
            text: chunk.text.clone(),
            meta: chunk.meta.clone(),
        }
    }
}

/// Stable item ID: hex MD5 of `"{doc_id}-{chunk_id}"`.
pub fn item_id(doc_id: &str, chunk_id: &str) -> String {
    format!("{:x}", md5::compute(format!("{}-{}", doc_id, chunk_id)))
}

/// Search results, closest first. `indices` point into the sink's items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub distances: Vec<f32>,
    pub indices: Vec<usize>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices.iter().copied().zip(self.distances.iter().copied())
    }
}

pub trait VectorSink: Send {
    fn name(&self) -> &'static str;

    /// Append chunks with their vectors and persist. Returns the number added.
    fn upsert(&mut self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize, SinkError>;

    fn search(&self, query: &[f32], k: usize) -> Result<SearchHits, SinkError>;

    fn items(&self) -> &[SinkItem];

    /// Vector width, once anything has been indexed.
    fn dim(&self) -> Option<usize>;

    fn metric(&self) -> Metric;
}

/// Shared upsert validation: equal counts and one consistent width.
fn check_vectors(
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    dim: Option<usize>,
) -> Result<Option<usize>, SinkError> {
    if chunks.len() != vectors.len() {
        return Err(SinkError::CountMismatch {
            chunks: chunks.len(),
            vectors: vectors.len(),
        });
    }
    let mut dim = dim;
    for v in vectors {
        match dim {
            Some(expected) if expected != v.len() => {
                return Err(SinkError::DimensionMismatch {
                    expected,
                    got: v.len(),
                })
            }
            Some(_) => {}
            None => dim = Some(v.len()),
        }
    }
    Ok(dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkBlockType, UnitSource, UnitType};

    pub(crate) fn chunk(id: &str, text: &str, doc_id: Option<&str>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            meta: ChunkMeta {
                pages: vec![1],
                heading_path: Vec::new(),
                source: UnitSource::Ocr,
                block_type: ChunkBlockType::Unit(UnitType::Paragraph),
                doc_id: doc_id.map(String::from),
            },
        }
    }

    #[test]
    fn test_item_id_uses_doc_and_chunk() {
        let item = SinkItem::from_chunk(&chunk("chunk-000001", "본문", Some("report")));
        assert_eq!(item.id, format!("{:x}", md5::compute("report-chunk-000001")));
        assert_eq!(item.id.len(), 32);

        let anonymous = SinkItem::from_chunk(&chunk("chunk-000001", "본문", None));
        assert_eq!(anonymous.id, item_id("unknown", "chunk-000001"));
    }

    #[test]
    fn test_metric_parse_and_order() {
        assert_eq!(Metric::parse("ip").unwrap(), Metric::IP);
        assert_eq!(Metric::parse("L2").unwrap(), Metric::L2);
        assert!(matches!(Metric::parse("cosine"), Err(SinkError::UnknownMetric(_))));

        assert_eq!(Metric::L2.score(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(Metric::IP.score(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        assert!(Metric::L2.passes(0.2, 0.5));
        assert!(!Metric::IP.passes(0.2, 0.5));
    }

    #[test]
    fn test_check_vectors() {
        let chunks = vec![chunk("a", "x", None), chunk("b", "y", None)];
        assert!(matches!(
            check_vectors(&chunks, &[vec![0.0; 3]], None),
            Err(SinkError::CountMismatch { chunks: 2, vectors: 1 })
        ));
        assert!(matches!(
            check_vectors(&chunks, &[vec![0.0; 3], vec![0.0; 2]], None),
            Err(SinkError::DimensionMismatch { expected: 3, got: 2 })
        ));
        assert_eq!(check_vectors(&chunks, &[vec![0.0; 3], vec![0.0; 3]], None).unwrap(), Some(3));
    }
}
