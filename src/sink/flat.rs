//! Exact flat vector index persisted as JSON next to its metadata list.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::Chunk;

use super::{check_vectors, Metric, SearchHits, SinkError, SinkItem, VectorSink};

/// Brute-force k-nearest search; ties keep insertion order.
pub fn flat_search(vectors: &[Vec<f32>], query: &[f32], k: usize, metric: Metric) -> SearchHits {
    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i, metric.score(v, query)))
        .collect();
    match metric {
        Metric::L2 => scored.sort_by(|a, b| a.1.total_cmp(&b.1)),
        Metric::IP => scored.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }
    scored.truncate(k);
    SearchHits {
        distances: scored.iter().map(|(_, s)| *s).collect(),
        indices: scored.into_iter().map(|(i, _)| i).collect(),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    metric: Metric,
    dim: Option<usize>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetaFile {
    dim: Option<usize>,
    #[serde(default)]
    items: Vec<SinkItem>,
}

pub struct FlatVectorSink {
    index_path: PathBuf,
    meta_path: PathBuf,
    metric: Metric,
    dim: Option<usize>,
    vectors: Vec<Vec<f32>>,
    items: Vec<SinkItem>,
}

impl FlatVectorSink {
    /// Open or create the index at `index_path`; metadata lives at
    /// `<index_path>.meta.json`.
    ///
    /// An existing index keeps its stored metric.
    pub fn open(index_path: impl Into<PathBuf>, metric: Metric) -> Result<Self, SinkError> {
        let index_path = index_path.into();
        let meta_path = meta_path_for(&index_path);

        let index: IndexFile = match fs::read_to_string(&index_path) {
            Ok(s) if !s.trim().is_empty() => serde_json::from_str(&s)?,
            Ok(_) => IndexFile::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexFile {
                metric,
                ..Default::default()
            },
            Err(e) => return Err(e.into()),
        };
        let meta: MetaFile = match fs::read_to_string(&meta_path) {
            Ok(s) if !s.trim().is_empty() => serde_json::from_str(&s)?,
            Ok(_) => MetaFile::default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MetaFile::default(),
            Err(e) => return Err(e.into()),
        };

        if index.metric != metric && !index.vectors.is_empty() {
            tracing::warn!(
                "index {} was built with {}, ignoring configured {}",
                index_path.display(),
                index.metric,
                metric
            );
        }
        let metric = if index.vectors.is_empty() { metric } else { index.metric };

        Ok(Self {
            index_path,
            meta_path,
            metric,
            dim: index.dim,
            vectors: index.vectors,
            items: meta.items,
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn save(&self) -> Result<(), SinkError> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let index = IndexFile {
            metric: self.metric,
            dim: self.dim,
            vectors: self.vectors.clone(),
        };
        fs::write(&self.index_path, serde_json::to_string(&index)?)?;

        let meta = MetaFile {
            dim: self.dim,
            items: self.items.clone(),
        };
        fs::write(&self.meta_path, serde_json::to_string_pretty(&meta)?)?;
        Ok(())
    }
}

fn meta_path_for(index_path: &Path) -> PathBuf {
    let mut name = index_path.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

impl VectorSink for FlatVectorSink {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn upsert(&mut self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize, SinkError> {
        let dim = check_vectors(chunks, vectors, self.dim)?;
        if chunks.is_empty() {
            return Ok(0);
        }
        self.dim = dim;
        self.vectors.extend(vectors.iter().cloned());
        self.items.extend(chunks.iter().map(SinkItem::from_chunk));
        self.save()?;
        tracing::info!(
            "flat index {}: +{} vectors ({} total)",
            self.index_path.display(),
            chunks.len(),
            self.vectors.len()
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
        Ok(flat_search(&self.vectors, query, k, self.metric))
    }

    fn items(&self) -> &[SinkItem] {
        &self.items
    }

    fn dim(&self) -> Option<usize> {
        self.dim
    }

    fn metric(&self) -> Metric {
        self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::tests::chunk;
    use tempfile::TempDir;

    #[test]
    fn test_flat_search_orders_by_metric() {
        let vectors = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![3.0, 0.0]];
        let hits = flat_search(&vectors, &[1.0, 0.0], 2, Metric::L2);
        assert_eq!(hits.indices, vec![0, 1]);
        assert_eq!(hits.distances, vec![1.0, 1.0]);

        let hits = flat_search(&vectors, &[1.0, 0.0], 5, Metric::IP);
        assert_eq!(hits.indices, vec![2, 1, 0]);
        assert_eq!(hits.distances, vec![3.0, 1.0, 0.0]);
    }

    #[test]
    fn test_upsert_persists_and_reopens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data").join("index.flat");

        let mut sink = FlatVectorSink::open(&path, Metric::IP).unwrap();
        assert!(sink.is_empty());
        let chunks = vec![chunk("chunk-000001", "가", Some("doc")), chunk("chunk-000002", "나", Some("doc"))];
        let added = sink.upsert(&chunks, &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(added, 2);
        assert!(sink.meta_path().ends_with("index.flat.meta.json"));

        let reopened = FlatVectorSink::open(&path, Metric::L2).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.metric(), Metric::IP);
        assert_eq!(reopened.dim(), Some(2));
        assert_eq!(reopened.items()[1].chunk_id, "chunk-000002");

        let hits = reopened.search(&[0.0, 2.0], 1).unwrap();
        assert_eq!(hits.indices, vec![1]);
        assert_eq!(reopened.items()[hits.indices[0]].text, "나");
    }

    #[test]
    fn test_rejects_mismatched_dimension() {
        let temp = TempDir::new().unwrap();
        let mut sink = FlatVectorSink::open(temp.path().join("i.flat"), Metric::L2).unwrap();
        sink.upsert(&[chunk("c1", "a", None)], &[vec![0.0; 4]]).unwrap();

        let err = sink.upsert(&[chunk("c2", "b", None)], &[vec![0.0; 3]]).unwrap_err();
        assert!(matches!(err, SinkError::DimensionMismatch { expected: 4, got: 3 }));
        assert!(matches!(
            sink.search(&[0.0; 2], 1),
            Err(SinkError::DimensionMismatch { .. })
        ));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_empty_index_search() {
        let temp = TempDir::new().unwrap();
        let sink = FlatVectorSink::open(temp.path().join("i.flat"), Metric::L2).unwrap();
        assert!(sink.search(&[0.0; 8], 3).unwrap().is_empty());
    }
}
