//! Data models shared across the pipeline.

mod block;
mod chunk;
mod unit;
mod vision;

pub use block::{Block, BlockType, Cell, OcrPage};
pub use chunk::{Chunk, ChunkBlockType, ChunkMeta, DraftChunk, MixedTag};
pub use unit::{Unit, UnitSource, UnitType};
pub use vision::{Caption, Fact, VisionResult};
