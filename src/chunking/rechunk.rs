//! Re-segmentation of previously indexed chunk text.

use serde::Deserialize;

use crate::models::{Unit, UnitSource, UnitType};
use crate::units::{is_h1, is_h2, is_table_row, strip_bullet, HeadingTracker};

/// Minimal view of a stored chunk: a bare chunk list or sink metadata items.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredChunk {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub meta: StoredMeta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredMeta {
    #[serde(default)]
    pub pages: Vec<u32>,
    #[serde(default)]
    pub source: UnitSource,
}

/// Accepts either `[{text, meta}, ...]` or `{"items": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredChunks {
    List(Vec<StoredChunk>),
    Items { items: Vec<StoredChunk> },
}

impl StoredChunks {
    pub fn into_vec(self) -> Vec<StoredChunk> {
        match self {
            StoredChunks::List(v) | StoredChunks::Items { items: v } => v,
        }
    }
}

/// Split one stored chunk back into line units.
///
/// Heading lines update the heading path and are consumed; every other
/// non-blank line becomes a list item, table row or paragraph on the chunk's
/// first page.
pub fn units_from_chunk(chunk: &StoredChunk) -> Vec<Unit> {
    let page = chunk.meta.pages.first().copied().unwrap_or(1).max(1);
    let mut headings = HeadingTracker::default();
    let mut units = Vec::new();

    for raw in chunk.text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if is_h1(line) {
            headings.set_h1(line);
            continue;
        }
        if is_h2(line) {
            headings.set_h2(line);
            continue;
        }
        let (unit_type, text) = match strip_bullet(line) {
            Some(item) => (UnitType::ListItem, item.trim()),
            None if is_table_row(line) => (UnitType::TableRow, line),
            None => (UnitType::Paragraph, line),
        };
        units.push(
            Unit::new(unit_type, text, page, chunk.meta.source).with_heading_path(headings.path()),
        );
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_both_layouts() {
        let list: StoredChunks =
            serde_json::from_str(r#"[{"text": "a", "meta": {"pages": [2]}}]"#).unwrap();
        assert_eq!(list.into_vec()[0].meta.pages, vec![2]);

        let items: StoredChunks = serde_json::from_str(
            r#"{"dim": 4, "items": [{"id": "x", "text": "b", "meta": {"source": "pdf_text"}}]}"#,
        )
        .unwrap();
        let items = items.into_vec();
        assert_eq!(items[0].text, "b");
        assert_eq!(items[0].meta.source, UnitSource::PdfText);
    }

    #[test]
    fn test_units_from_chunk() {
        let chunk = StoredChunk {
            text: "Ⅰ. 개요\n\n본문 한 줄\n1. 세부\n- 항목\n| a | b |".to_string(),
            meta: StoredMeta {
                pages: vec![3, 4],
                source: UnitSource::Ocr,
            },
        };
        let units = units_from_chunk(&chunk);
        let types: Vec<_> = units.iter().map(|u| u.unit_type).collect();
        assert_eq!(
            types,
            vec![UnitType::Paragraph, UnitType::ListItem, UnitType::TableRow]
        );
        assert_eq!(units[0].heading_path, vec!["Ⅰ. 개요"]);
        assert_eq!(units[1].text, "항목");
        assert_eq!(units[1].heading_path, vec!["Ⅰ. 개요", "1. 세부"]);
        assert!(units.iter().all(|u| u.page == 3 && u.source == UnitSource::Ocr));
    }
}
