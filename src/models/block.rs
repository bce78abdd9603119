//! Recognition blocks: one detected region of a page image.

use serde::{Deserialize, Serialize};

/// Kind of region a recognition engine reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Title,
    #[default]
    Paragraph,
    Table,
}

/// A single table cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub text: String,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Raw engine output for one detected region.
///
/// `bbox` is `[x0, y0, x1, y1]` in pixels. Tables carry `cells` as a row-major
/// grid; their `text` is usually empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    pub bbox: [f32; 4],
    #[serde(default)]
    pub text: String,
    /// Confidence in [0, 1]. Falls back to the page average when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<Vec<Cell>>,
}

impl Block {
    pub fn top(&self) -> f32 {
        self.bbox[1]
    }

    pub fn left(&self) -> f32 {
        self.bbox[0]
    }
}

/// One page of OCR output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub page: u32,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Mean of block confidences, 0 when there are no blocks.
    #[serde(default)]
    pub avg_conf: f32,
    #[serde(default)]
    pub lang: String,
}

impl OcrPage {
    /// Build a page from blocks, computing `avg_conf` from their confidences.
    pub fn from_blocks(page: u32, blocks: Vec<Block>, lang: impl Into<String>) -> Self {
        let avg_conf = if blocks.is_empty() {
            0.0
        } else {
            blocks.iter().map(|b| b.conf.unwrap_or(0.0)).sum::<f32>() / blocks.len() as f32
        };
        Self {
            page,
            blocks,
            avg_conf,
            lang: lang.into(),
        }
    }

    /// Page with no recognized content, used when recognition fails.
    pub fn empty(page: u32, lang: impl Into<String>) -> Self {
        Self::from_blocks(page, Vec::new(), lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, conf: f32) -> Block {
        Block {
            id: id.to_string(),
            block_type: BlockType::Paragraph,
            bbox: [0.0, 0.0, 10.0, 10.0],
            text: "x".to_string(),
            conf: Some(conf),
            cells: Vec::new(),
        }
    }

    #[test]
    fn test_avg_conf_is_mean_of_blocks() {
        let page = OcrPage::from_blocks(1, vec![block("a", 0.9), block("b", 0.5)], "kor+eng");
        assert!((page.avg_conf - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_avg_conf_empty_page() {
        let page = OcrPage::empty(3, "kor");
        assert_eq!(page.avg_conf, 0.0);
        assert!(page.blocks.is_empty());
    }

    #[test]
    fn test_block_deserializes_table_schema() {
        let json = r#"{"id":"t1","type":"table","bbox":[50,420,1000,700],
            "cells":[[{"text":"항목"},{"text":"값"}],[{"text":"연도"},{"text":"2025"}]],"conf":0.9}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.block_type, BlockType::Table);
        assert_eq!(block.cells.len(), 2);
        assert_eq!(block.cells[1][1].text, "2025");
        assert!(block.text.is_empty());
    }
}
