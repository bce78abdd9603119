//! OCR consensus and page image handling.
//!
//! Page images are run through several preprocessing variants and one or more
//! language profiles:
//! - `preprocess`: raw, inverted, adaptive threshold, tile-wise polarity threshold
//! - `tesseract`: recognition via the tesseract binary (TSV output)
//! - `lines`: token grouping, spacing correction, line confidence
//! - `consensus`: best variant per profile, index-wise profile merge
//!
//! `pdf_utils` wraps the Poppler tools used to render pages and read
//! embedded text.

mod backend;
mod consensus;
mod lines;
mod model_utils;
mod pdf_utils;
mod preprocess;
mod spacing;
mod tesseract;

pub use backend::{
    LanguageProfile, OcrError, RecognitionEngine, RecognitionProvider, RecognitionSettings, Token,
};
pub use consensus::{best_for_lang, merge_by_index, Candidate, OcrConsensusEngine};
pub use lines::{group_lines, mean_conf, OcrLine};
pub use model_utils::check_binary;
pub use pdf_utils::{
    page_image_name, NativeText, PageRenderer, PdftoppmRenderer, PdftotextExtractor,
    RenderError, RenderedPage,
};
pub use preprocess::{Preprocessor, Variant};
pub use spacing::{CommandSpacing, NoSpacing, ScriptBoundarySpacing, SpacingCorrector};
pub use tesseract::{parse_tsv, TesseractEngine};
