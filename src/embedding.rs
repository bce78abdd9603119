//! Text embedding.
//!
//! The embedder is a seam: the bundled implementation is a deterministic stub
//! that derives vectors from text length, enough to exercise indexing and
//! search end to end without a model.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Invalid embedding dimension: {0}")]
    InvalidDimension(usize),

    #[error("Embedding failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;

    /// Width of every vector this embedder returns.
    fn dim(&self) -> usize;

    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Length-derived stub embeddings.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    model: String,
    dim: usize,
}

impl StubEmbedder {
    pub fn new(model: impl Into<String>, dim: usize) -> Result<Self, EmbeddingError> {
        if dim == 0 {
            return Err(EmbeddingError::InvalidDimension(dim));
        }
        Ok(Self {
            model: model.into(),
            dim,
        })
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let base = (text.chars().count() % 1000) as f32 / 1000.0;
        (0..self.dim)
            .map(|i| base * ((i % 13) + 1) as f32 / 13.0)
            .collect()
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tracing::debug!("embedding {} texts with {}", texts.len(), self.model);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}
