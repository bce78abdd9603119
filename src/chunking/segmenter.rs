//! Length-bounded chunk segmentation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{Chunk, DraftChunk, Unit};

use super::buffer::{draft_from_units, ChunkBuffer, UNIT_SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub max_chars: usize,
    pub min_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 1400,
            min_chars: 800,
            overlap_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkSegmenter {
    config: ChunkConfig,
}

impl ChunkSegmenter {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Units must arrive in page, then reading order.
    pub fn segment(&self, units: &[Unit]) -> Vec<Chunk> {
        let drafts = self.pack(units);
        let drafts = inject_overlap(drafts, self.config.overlap_chars);
        assign_ids(dedup(drafts))
    }

    /// Buffer units into drafts, isolating structural types.
    fn pack(&self, units: &[Unit]) -> Vec<DraftChunk> {
        let ChunkConfig {
            max_chars,
            min_chars,
            ..
        } = self.config;
        let mut buffer = ChunkBuffer::new();
        let mut drafts = Vec::new();

        for unit in units {
            if unit.unit_type.is_isolated() {
                drafts.extend(buffer.flush());
                drafts.push(draft_from_units(std::slice::from_ref(unit)));
                continue;
            }

            let len = unit.text.chars().count();
            if buffer.chars() + len > max_chars && buffer.chars() >= min_chars {
                drafts.extend(buffer.flush());
            }
            buffer.append(unit.clone());
        }
        drafts.extend(buffer.flush());

        tracing::debug!("packed {} units into {} chunks", units.len(), drafts.len());
        drafts
    }
}

/// Segment with explicit bounds.
pub fn segment(units: &[Unit], max_chars: usize, min_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    ChunkSegmenter::new(ChunkConfig {
        max_chars,
        min_chars,
        overlap_chars,
    })
    .segment(units)
}

/// Prefix every chunk after the first with the tail of the previous chunk's
/// text as it was before its own prefix was added.
fn inject_overlap(drafts: Vec<DraftChunk>, overlap_chars: usize) -> Vec<DraftChunk> {
    if overlap_chars == 0 || drafts.len() < 2 {
        return drafts;
    }

    let mut out = Vec::with_capacity(drafts.len());
    let mut previous: Option<String> = None;
    for mut draft in drafts {
        let original = draft.text.clone();
        if let Some(prev) = &previous {
            let tail = tail_chars(prev, overlap_chars);
            if !tail.is_empty() {
                draft.text = format!("{}{}{}", tail, UNIT_SEPARATOR, draft.text);
            }
        }
        previous = Some(original);
        out.push(draft);
    }
    out
}

/// Last `n` characters of `text`.
pub fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Drop exact text duplicates, keeping first occurrences.
fn dedup(drafts: Vec<DraftChunk>) -> Vec<DraftChunk> {
    let mut seen = HashSet::new();
    let before = drafts.len();
    let kept: Vec<DraftChunk> = drafts
        .into_iter()
        .filter(|d| seen.insert(md5::compute(d.text.as_bytes()).0))
        .collect();
    if kept.len() < before {
        tracing::debug!("dropped {} duplicate chunks", before - kept.len());
    }
    kept
}

fn assign_ids(drafts: Vec<DraftChunk>) -> Vec<Chunk> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| Chunk {
            id: Chunk::format_id(i + 1),
            text: d.text,
            meta: d.meta,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkBlockType, UnitSource, UnitType};

    fn unit(unit_type: UnitType, text: &str, page: u32) -> Unit {
        Unit::new(unit_type, text, page, UnitSource::Ocr)
    }

    fn para(text: &str, page: u32) -> Unit {
        unit(UnitType::Paragraph, text, page)
    }

    fn sample_units() -> Vec<Unit> {
        vec![
            unit(UnitType::Title, "개요", 1),
            para(&"가".repeat(30), 1),
            para(&"나".repeat(45), 1),
            unit(UnitType::ListItem, &"다".repeat(20), 2),
            unit(UnitType::Table, "| a | b |\n| --- | --- |\n| 1 | 2 |", 2),
            para(&"라".repeat(70), 2),
            unit(UnitType::Code, "fn main() {}", 3),
            para(&"마".repeat(15), 3),
            para(&"바".repeat(25), 3),
        ]
    }

    #[test]
    fn test_worked_example() {
        let a = "A".repeat(50);
        let b = "B".repeat(50);
        let units = vec![
            unit(UnitType::Title, "개요", 1),
            para(&a, 1),
            para(&b, 1),
        ];
        let chunks = segment(&units, 60, 40, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "chunk-000001");
        assert_eq!(chunks[0].text, "개요");
        assert_eq!(chunks[0].meta.block_type, ChunkBlockType::Unit(UnitType::Title));
        assert_eq!(chunks[1].text, format!("개요\n\n{}", a));
        assert_eq!(chunks[2].id, "chunk-000003");
        assert_eq!(chunks[2].text, format!("{}\n\n{}", "A".repeat(10), b));
        assert_eq!(chunks[2].meta.block_type, ChunkBlockType::Unit(UnitType::Paragraph));
    }

    #[test]
    fn test_no_loss_without_overlap() {
        let units = sample_units();
        let chunks = segment(&units, 60, 40, 0);

        let flowing: Vec<&str> = units
            .iter()
            .filter(|u| !u.unit_type.is_isolated())
            .map(|u| u.text.as_str())
            .collect();
        let rebuilt: Vec<&str> = chunks
            .iter()
            .filter(|c| !matches!(c.meta.block_type, ChunkBlockType::Unit(t) if t.is_isolated()))
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(rebuilt.join("\n\n"), flowing.join("\n\n"));
    }

    #[test]
    fn test_segmentation_is_idempotent() {
        let units = sample_units();
        let first = segment(&units, 60, 40, 12);
        let second = segment(&units, 60, 40, 12);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlap_prefix_matches_previous_tail() {
        let units = sample_units();
        let plain = segment(&units, 60, 40, 0);
        let overlapped = segment(&units, 60, 40, 12);
        assert_eq!(plain.len(), overlapped.len());
        assert_eq!(overlapped[0].text, plain[0].text);

        for i in 1..overlapped.len() {
            let tail = tail_chars(&plain[i - 1].text, 12);
            assert!(overlapped[i].text.starts_with(tail), "chunk {}", i);
            assert_eq!(overlapped[i].text, format!("{}\n\n{}", tail, plain[i].text));
        }
    }

    #[test]
    fn test_overlap_shorter_than_window_uses_whole_text() {
        let units = vec![unit(UnitType::Title, "표 1", 1), para("본문", 1)];
        let chunks = segment(&units, 100, 10, 50);
        assert_eq!(chunks[1].text, "표 1\n\n본문");
    }

    #[test]
    fn test_structural_units_are_singletons() {
        let units = sample_units();
        let chunks = segment(&units, 10_000, 0, 0);
        let isolated: Vec<_> = chunks
            .iter()
            .filter_map(|c| match c.meta.block_type {
                ChunkBlockType::Unit(t) if t.is_isolated() => Some((t, c.text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            isolated,
            vec![
                (UnitType::Title, "개요"),
                (UnitType::Table, "| a | b |\n| --- | --- |\n| 1 | 2 |"),
                (UnitType::Code, "fn main() {}"),
            ]
        );
        // Flowing text between structural units still merges.
        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks[1].meta.block_type, ChunkBlockType::MIXED);
        assert_eq!(chunks[1].meta.pages, vec![1, 2]);
    }

    #[test]
    fn test_isolation_flushes_undersized_buffer() {
        let units = vec![para("짧다", 1), unit(UnitType::Table, "| x |", 1), para("끝", 1)];
        let chunks = segment(&units, 1000, 500, 0);
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["짧다", "| x |", "끝"]);
    }

    #[test]
    fn test_min_chars_guard_keeps_merging() {
        // 30 + 45 exceeds max but the buffer is still below min.
        let units = vec![para(&"가".repeat(30), 1), para(&"나".repeat(45), 1)];
        let chunks = segment(&units, 60, 40, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text.chars().count(), 30 + 2 + 45);
    }

    #[test]
    fn test_duplicates_are_dropped_and_ids_dense() {
        let units = vec![
            unit(UnitType::Title, "반복", 1),
            unit(UnitType::Title, "반복", 2),
            unit(UnitType::Title, "다른", 2),
        ];
        let chunks = segment(&units, 100, 0, 0);
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["chunk-000001", "chunk-000002"]);
        assert_eq!(chunks[0].meta.pages, vec![1]);
        assert_eq!(chunks[1].text, "다른");

        let texts: HashSet<_> = segment(&sample_units(), 60, 40, 12)
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts.len(), segment(&sample_units(), 60, 40, 12).len());
    }

    #[test]
    fn test_tail_chars_is_char_based() {
        assert_eq!(tail_chars("가나다라", 2), "다라");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("abc", 0), "");
    }

    #[test]
    fn test_empty_input() {
        assert!(segment(&[], 60, 40, 10).is_empty());
    }
}
