//! rag-ingest - page OCR consensus and retrieval chunking for Korean documents.
//!
//! Turns scanned or digital PDFs into semantic units and size-bounded,
//! overlapping chunks ready for embedding.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod corrections;
pub mod embedding;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod sink;
pub mod units;
