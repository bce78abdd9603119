//! Page processing loop and its collaborators.

mod collaborators;
mod gate;
mod ingest;

pub use collaborators::{NullVision, PassThrough, UnitStructurer, VisionInterpreter};
pub use gate::{should_fallback, PageRoute};
pub use ingest::{
    check_vector_count, doc_id_for, IndexSummary, IngestEvent, IngestMode, IngestOptions,
    IngestPipeline, IngestReport, PageSource, PageSummary, PipelineError,
};
