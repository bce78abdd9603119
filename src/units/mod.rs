//! Semantic unit assembly.
//!
//! Turns one page's recognition output, native text or vision interpretation
//! into ordered typed units with a two-level heading path.

mod assembler;
mod patterns;

pub use assembler::{render_table, AssembleMode, HeadingTracker, PageRecord, UnitAssembler, VISION_CONF};
pub use patterns::{
    dehyphenate, ends_sentence, is_h1, is_h2, is_noise, is_table_row, normalize, split_sentences,
    strip_bullet,
};
