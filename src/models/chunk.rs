//! Retrieval chunks produced by the segmenter.

use serde::{Deserialize, Serialize};

use super::unit::{UnitSource, UnitType};

/// `block_type` of a chunk: the shared unit type, or `mixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkBlockType {
    Unit(UnitType),
    Mixed(MixedTag),
}

/// Serializes as the literal string `"mixed"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedTag {
    Mixed,
}

impl ChunkBlockType {
    pub const MIXED: ChunkBlockType = ChunkBlockType::Mixed(MixedTag::Mixed);

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkBlockType::Unit(t) => t.as_str(),
            ChunkBlockType::Mixed(_) => "mixed",
        }
    }
}

impl From<UnitType> for ChunkBlockType {
    fn from(t: UnitType) -> Self {
        ChunkBlockType::Unit(t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Sorted, distinct pages of the units merged into the chunk.
    pub pages: Vec<u32>,
    #[serde(default)]
    pub heading_path: Vec<String>,
    pub source: UnitSource,
    pub block_type: ChunkBlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

/// A chunk before overlap, dedup and ID assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftChunk {
    pub text: String,
    pub meta: ChunkMeta,
}

/// Final chunk, identified as `chunk-NNNNNN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub meta: ChunkMeta,
}

impl Chunk {
    /// Format the 1-based sequential chunk ID.
    pub fn format_id(index: usize) -> String {
        format!("chunk-{:06}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_id() {
        assert_eq!(Chunk::format_id(1), "chunk-000001");
        assert_eq!(Chunk::format_id(123456), "chunk-123456");
    }

    #[test]
    fn test_block_type_serialization() {
        let mixed = serde_json::to_string(&ChunkBlockType::MIXED).unwrap();
        assert_eq!(mixed, "\"mixed\"");
        let table = serde_json::to_string(&ChunkBlockType::from(UnitType::Table)).unwrap();
        assert_eq!(table, "\"table\"");

        let parsed: ChunkBlockType = serde_json::from_str("\"mixed\"").unwrap();
        assert_eq!(parsed, ChunkBlockType::MIXED);
        let parsed: ChunkBlockType = serde_json::from_str("\"list_item\"").unwrap();
        assert_eq!(parsed, ChunkBlockType::Unit(UnitType::ListItem));
    }
}
