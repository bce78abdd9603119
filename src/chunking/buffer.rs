//! Accumulation buffer for the segmenter.

use std::collections::BTreeSet;

use crate::models::{ChunkBlockType, ChunkMeta, DraftChunk, Unit};

/// Separator placed between unit texts inside one chunk.
pub const UNIT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Default, PartialEq)]
enum BufferState {
    #[default]
    Empty,
    Accumulating {
        units: Vec<Unit>,
        /// Characters across buffered unit texts, separators excluded.
        chars: usize,
    },
}

/// Explicit `Empty` / `Accumulating` state machine.
///
/// `append` always moves to `Accumulating`; `flush` always returns to `Empty`,
/// yielding a draft chunk when anything was buffered.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuffer {
    state: BufferState,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, BufferState::Empty)
    }

    /// Buffered character count.
    pub fn chars(&self) -> usize {
        match &self.state {
            BufferState::Empty => 0,
            BufferState::Accumulating { chars, .. } => *chars,
        }
    }

    pub fn append(&mut self, unit: Unit) {
        let len = unit.text.chars().count();
        match &mut self.state {
            BufferState::Empty => {
                self.state = BufferState::Accumulating {
                    units: vec![unit],
                    chars: len,
                };
            }
            BufferState::Accumulating { units, chars } => {
                units.push(unit);
                *chars += len;
            }
        }
    }

    pub fn flush(&mut self) -> Option<DraftChunk> {
        match std::mem::take(&mut self.state) {
            BufferState::Empty => None,
            BufferState::Accumulating { units, .. } => Some(draft_from_units(&units)),
        }
    }
}

/// Build a draft chunk from a non-empty run of units.
pub fn draft_from_units(units: &[Unit]) -> DraftChunk {
    let text = units
        .iter()
        .map(|u| u.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(UNIT_SEPARATOR);

    let pages: BTreeSet<u32> = units.iter().map(|u| u.page).collect();
    let first = &units[0];
    let block_type = if units.iter().all(|u| u.unit_type == first.unit_type) {
        ChunkBlockType::from(first.unit_type)
    } else {
        ChunkBlockType::MIXED
    };

    DraftChunk {
        text,
        meta: ChunkMeta {
            pages: pages.into_iter().collect(),
            heading_path: first.heading_path.clone(),
            source: first.source,
            block_type,
            doc_id: None,
        },
    }
}
