//! Document ingestion: pages to units to chunks to vectors.
//!
//! Page work runs off the async runtime with `spawn_blocking`, at most
//! `workers` pages at a time, and comes back in page order. A page whose
//! recognition fails is treated as empty and goes through the fallback gate
//! like any other page.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::chunking::{ChunkConfig, ChunkSegmenter};
use crate::embedding::{Embedder, EmbeddingError};
use crate::models::{Chunk, OcrPage, Unit};
use crate::ocr::{NativeText, OcrConsensusEngine, OcrError, PageRenderer, RenderError, RenderedPage};
use crate::sink::{SinkError, VectorSink};
use crate::units::{PageRecord, UnitAssembler};

use super::collaborators::{NullVision, PassThrough, UnitStructurer, VisionInterpreter};
use super::gate::PageRoute;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Chunk/vector count mismatch: {chunks} chunks, {vectors} vectors")]
    VectorCountMismatch { chunks: usize, vectors: usize },

    #[error("Page task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How page text is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    #[default]
    Ocr,
    PdfText,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Ocr => "ocr",
            IngestMode::PdfText => "pdf_text",
        }
    }
}

/// Page text provider.
#[derive(Clone)]
pub enum PageSource {
    /// Render pages and run OCR consensus on each image.
    Ocr {
        renderer: Arc<dyn PageRenderer>,
        engine: Arc<OcrConsensusEngine>,
    },
    /// Use the PDF's embedded text.
    PdfText(Arc<dyn NativeText>),
}

impl PageSource {
    pub fn mode(&self) -> IngestMode {
        match self {
            PageSource::Ocr { .. } => IngestMode::Ocr,
            PageSource::PdfText(_) => IngestMode::PdfText,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub dpi: u32,
    pub ocr_conf_threshold: f32,
    pub workers: usize,
    pub chunk: ChunkConfig,
    /// 1-based pages to process; `None` means the whole document.
    pub pages: Option<Vec<u32>>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            dpi: 300,
            ocr_conf_threshold: 0.75,
            workers: 4,
            chunk: ChunkConfig::default(),
            pages: None,
        }
    }
}

/// Progress events emitted during ingestion.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    Rendered { pages: usize },
    PageCompleted {
        page: u32,
        route: Option<PageRoute>,
        units: usize,
    },
    PageFailed { page: u32, error: String },
    Chunked { chunks: usize, vision_chunks: usize },
}

/// Per-page outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub page: u32,
    /// `None` for native-text pages, which never pass through the gate.
    pub route: Option<PageRoute>,
    pub avg_conf: Option<f32>,
    pub blocks: usize,
    pub units: usize,
    /// Recognition failed and the page was treated as empty.
    pub failed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub doc_id: String,
    pub pages: Vec<PageSummary>,
    /// Every unit in page then reading order, vision units included.
    pub units: Vec<Unit>,
    /// Chunks of primary (`ocr` / `pdf_text`) units.
    pub chunks: Vec<Chunk>,
    /// Chunks of `vision_infer` units, indexed separately.
    pub vision_chunks: Vec<Chunk>,
}

impl IngestReport {
    pub fn primary_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.source.is_primary())
    }

    pub fn vision_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| !u.source.is_primary())
    }

    pub fn fallback_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.route == Some(PageRoute::UseFallback))
            .map(|p| p.page)
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Ingested {} pages → {} units → {} chunks",
            self.pages.len(),
            self.units.len(),
            self.chunks.len()
        )
    }

    /// Write `units.json`, `chunks.json` and, when present, `vision_chunks.json`.
    pub fn write_outputs(&self, out_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        std::fs::create_dir_all(out_dir)?;
        let mut written = Vec::new();

        let path = out_dir.join("units.json");
        std::fs::write(&path, serde_json::to_string_pretty(&self.units)?)?;
        written.push(path);

        let path = out_dir.join("chunks.json");
        std::fs::write(&path, serde_json::to_string_pretty(&self.chunks)?)?;
        written.push(path);

        if !self.vision_chunks.is_empty() {
            let path = out_dir.join("vision_chunks.json");
            std::fs::write(&path, serde_json::to_string_pretty(&self.vision_chunks)?)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Counts of vectors written by [`IngestPipeline::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub primary: usize,
    pub vision: usize,
}

pub struct IngestPipeline {
    source: PageSource,
    vision: Arc<dyn VisionInterpreter>,
    structurer: Arc<dyn UnitStructurer>,
    embedder: Arc<dyn Embedder>,
    assembler: UnitAssembler,
    options: IngestOptions,
}

impl IngestPipeline {
    pub fn new(source: PageSource, embedder: Arc<dyn Embedder>, options: IngestOptions) -> Self {
        Self {
            source,
            vision: Arc::new(NullVision),
            structurer: Arc::new(PassThrough),
            embedder,
            assembler: UnitAssembler::new(),
            options,
        }
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionInterpreter>) -> Self {
        self.vision = vision;
        self
    }

    pub fn with_structurer(mut self, structurer: Arc<dyn UnitStructurer>) -> Self {
        self.structurer = structurer;
        self
    }

    pub fn mode(&self) -> IngestMode {
        self.source.mode()
    }

    /// Extract, assemble, structure and chunk one document.
    ///
    /// Page images are rendered into `out_dir`.
    pub async fn run(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        event_tx: mpsc::Sender<IngestEvent>,
    ) -> Result<IngestReport, PipelineError> {
        let doc_id = doc_id_for(pdf_path);
        tracing::info!("ingesting {} as {} ({})", pdf_path.display(), doc_id, self.mode().as_str());

        let outcomes = match &self.source {
            PageSource::Ocr { renderer, engine } => {
                self.ocr_pages(renderer.clone(), engine.clone(), pdf_path, out_dir, &event_tx)
                    .await?
            }
            PageSource::PdfText(native) => {
                self.native_pages(native.clone(), pdf_path, &event_tx).await?
            }
        };

        let mut pages = Vec::with_capacity(outcomes.len());
        let mut units = Vec::new();
        for outcome in outcomes {
            pages.push(outcome.summary);
            units.extend(outcome.units);
        }

        let (primary, vision): (Vec<Unit>, Vec<Unit>) =
            units.into_iter().partition(|u| u.source.is_primary());
        let primary = self.structurer.structure(primary);

        let segmenter = ChunkSegmenter::new(self.options.chunk);
        let chunks = with_doc_id(segmenter.segment(&primary), &doc_id);
        let vision_chunks = with_doc_id(segmenter.segment(&vision), &doc_id);
        let _ = event_tx
            .send(IngestEvent::Chunked {
                chunks: chunks.len(),
                vision_chunks: vision_chunks.len(),
            })
            .await;

        let mut units = primary;
        units.extend(vision);
        units.sort_by_key(|u| u.page);

        let report = IngestReport {
            doc_id,
            pages,
            units,
            chunks,
            vision_chunks,
        };
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Embed the report's chunks and upsert them.
    ///
    /// Every vector is computed and counted before either sink is written.
    /// Vision chunks only ever go to `vision_sink`.
    pub async fn index(
        &self,
        report: &IngestReport,
        sink: &mut dyn VectorSink,
        vision_sink: Option<&mut dyn VectorSink>,
    ) -> Result<IndexSummary, PipelineError> {
        let vectors = self.embed_checked(&report.chunks).await?;
        let vision_vectors = match &vision_sink {
            Some(_) if !report.vision_chunks.is_empty() => {
                Some(self.embed_checked(&report.vision_chunks).await?)
            }
            _ => None,
        };

        let mut summary = IndexSummary {
            primary: sink.upsert(&report.chunks, &vectors)?,
            vision: 0,
        };
        match (vision_sink, vision_vectors) {
            (Some(vision_sink), Some(vision_vectors)) => {
                summary.vision = vision_sink.upsert(&report.vision_chunks, &vision_vectors)?;
            }
            (None, _) if !report.vision_chunks.is_empty() => {
                tracing::warn!(
                    "{} vision chunks not indexed: no vision collection configured",
                    report.vision_chunks.len()
                );
            }
            _ => {}
        }
        Ok(summary)
    }

    async fn embed_checked(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        check_vector_count(chunks.len(), vectors.len())?;
        Ok(vectors)
    }

    async fn ocr_pages(
        &self,
        renderer: Arc<dyn PageRenderer>,
        engine: Arc<OcrConsensusEngine>,
        pdf_path: &Path,
        out_dir: &Path,
        event_tx: &mpsc::Sender<IngestEvent>,
    ) -> Result<Vec<PageOutcome>, PipelineError> {
        let dpi = self.options.dpi;
        let rendered = {
            let pdf_path = pdf_path.to_path_buf();
            let out_dir = out_dir.to_path_buf();
            let pages = self.options.pages.clone();
            tokio::task::spawn_blocking(move || {
                renderer.render(&pdf_path, dpi, &out_dir, pages.as_deref())
            })
            .await??
        };
        tracing::info!("rendered {} pages at {} dpi", rendered.len(), dpi);
        let _ = event_tx
            .send(IngestEvent::Rendered {
                pages: rendered.len(),
            })
            .await;

        let threshold = self.options.ocr_conf_threshold;
        let workers = self.options.workers.max(1);
        let tasks = rendered.into_iter().map(|page| {
            let engine = engine.clone();
            let vision = self.vision.clone();
            let assembler = self.assembler;
            tokio::task::spawn_blocking(move || {
                ocr_page(&engine, vision.as_ref(), &assembler, &page, threshold)
            })
        });
        let joined: Vec<_> = stream::iter(tasks).buffered(workers).collect().await;

        let mut outcomes = Vec::with_capacity(joined.len());
        for result in joined {
            let (outcome, error) = result?;
            let page = outcome.summary.page;
            if let Some(error) = error {
                let _ = event_tx.send(IngestEvent::PageFailed { page, error }).await;
            }
            let _ = event_tx
                .send(IngestEvent::PageCompleted {
                    page,
                    route: outcome.summary.route,
                    units: outcome.units.len(),
                })
                .await;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn native_pages(
        &self,
        native: Arc<dyn NativeText>,
        pdf_path: &Path,
        event_tx: &mpsc::Sender<IngestEvent>,
    ) -> Result<Vec<PageOutcome>, PipelineError> {
        let texts: Vec<(u32, String)> = {
            let pdf_path = pdf_path.to_path_buf();
            let pages = self.options.pages.clone();
            tokio::task::spawn_blocking(move || match pages {
                Some(pages) => pages
                    .into_iter()
                    .map(|page| native.page_text(&pdf_path, page).map(|text| (page, text)))
                    .collect::<Result<Vec<_>, _>>(),
                None => native
                    .document_text(&pdf_path)
                    .map(|texts| (1u32..).zip(texts).collect()),
            })
            .await??
        };
        let _ = event_tx.send(IngestEvent::Rendered { pages: texts.len() }).await;

        let mut outcomes = Vec::with_capacity(texts.len());
        for (page, text) in texts {
            let units = self.assembler.assemble(&PageRecord::PdfText(text), page);
            tracing::debug!("page {}: {} native-text units", page, units.len());
            let _ = event_tx
                .send(IngestEvent::PageCompleted {
                    page,
                    route: None,
                    units: units.len(),
                })
                .await;
            outcomes.push(PageOutcome {
                summary: PageSummary {
                    page,
                    route: None,
                    avg_conf: None,
                    blocks: 0,
                    units: units.len(),
                    failed: false,
                },
                units,
            });
        }
        Ok(outcomes)
    }
}

struct PageOutcome {
    summary: PageSummary,
    units: Vec<Unit>,
}

/// OCR one rendered page and route it through the gate.
///
/// Returns the recognition error text alongside the outcome when the page
/// had to be treated as empty.
fn ocr_page(
    engine: &OcrConsensusEngine,
    vision: &dyn VisionInterpreter,
    assembler: &UnitAssembler,
    rendered: &RenderedPage,
    threshold: f32,
) -> (PageOutcome, Option<String>) {
    let page_no = rendered.page;
    let (ocr, error) = match engine.run(&rendered.path, page_no) {
        Ok(ocr) => (ocr, None),
        Err(e) => {
            tracing::warn!("page {}: recognition failed, treating as empty: {}", page_no, e);
            let lang = engine
                .profiles()
                .first()
                .map(|p| p.language.clone())
                .unwrap_or_default();
            (OcrPage::empty(page_no, lang), Some(e.to_string()))
        }
    };

    let route = PageRoute::decide(ocr.avg_conf, ocr.blocks.len(), threshold);
    tracing::debug!(
        "page {}: {} blocks, avg conf {:.3} -> {}",
        page_no,
        ocr.blocks.len(),
        ocr.avg_conf,
        route
    );

    let avg_conf = ocr.avg_conf;
    let blocks = ocr.blocks.len();
    let record = match route {
        PageRoute::UseOcr => PageRecord::Ocr(ocr),
        PageRoute::UseFallback => PageRecord::Vision(vision.interpret(&rendered.path)),
    };
    let units = assembler.assemble(&record, page_no);

    let outcome = PageOutcome {
        summary: PageSummary {
            page: page_no,
            route: Some(route),
            avg_conf: Some(avg_conf),
            blocks,
            units: units.len(),
            failed: error.is_some(),
        },
        units,
    };
    (outcome, error)
}

/// Chunk count must equal vector count before anything is persisted.
pub fn check_vector_count(chunks: usize, vectors: usize) -> Result<(), PipelineError> {
    if chunks != vectors {
        return Err(PipelineError::VectorCountMismatch { chunks, vectors });
    }
    Ok(())
}

/// Document identifier: the PDF file stem.
pub fn doc_id_for(pdf_path: &Path) -> String {
    pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn with_doc_id(mut chunks: Vec<Chunk>, doc_id: &str) -> Vec<Chunk> {
    for chunk in &mut chunks {
        chunk.meta.doc_id = Some(doc_id.to_string());
    }
    chunks
}
