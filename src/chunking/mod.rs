//! Chunk segmentation: bounded packing, structural isolation, overlap,
//! dedup and ID assignment.

mod buffer;
mod rechunk;
mod segmenter;

pub use buffer::{draft_from_units, ChunkBuffer, UNIT_SEPARATOR};
pub use rechunk::{units_from_chunk, StoredChunk, StoredChunks, StoredMeta};
pub use segmenter::{segment, tail_chars, ChunkConfig, ChunkSegmenter};
