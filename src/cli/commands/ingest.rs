//! Ingest command.

use std::path::Path;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::corrections::export_ocr_lines;
use crate::ocr::{PdftoppmRenderer, PdftotextExtractor};
use crate::pipeline::{IngestEvent, IngestMode, IngestPipeline, PageRoute, PageSource};
use crate::sink::VectorSink;

pub async fn cmd_ingest(
    config: &Config,
    pdf: &Path,
    out: &Path,
    mode: IngestMode,
    pages: Option<Vec<u32>>,
) -> anyhow::Result<()> {
    if !pdf.exists() {
        anyhow::bail!("PDF not found: {}", pdf.display());
    }

    // A missing recognition binary is fatal before any page is touched.
    let source = match mode {
        IngestMode::Ocr => PageSource::Ocr {
            renderer: Arc::new(PdftoppmRenderer),
            engine: Arc::new(config.ocr.build_engine()?),
        },
        IngestMode::PdfText => PageSource::PdfText(Arc::new(PdftotextExtractor)),
    };
    let embedder = Arc::new(config.embedder.build()?);
    let mut sink = config.vector_sink.open()?;
    let mut vision_sink = config.vector_sink.open_vision()?;

    let mut options = config.ingest_options();
    options.pages = pages.map(|mut pages| {
        pages.sort_unstable();
        pages.dedup();
        pages
    });
    let pipeline = IngestPipeline::new(source, embedder, options);

    let (event_tx, mut event_rx) = mpsc::channel::<IngestEvent>(64);
    let event_handler = tokio::spawn(async move {
        let mut progress: Option<ProgressBar> = None;
        let mut fallback = 0usize;
        let mut failed = 0usize;
        while let Some(event) = event_rx.recv().await {
            match event {
                IngestEvent::Rendered { pages } => {
                    let pb = ProgressBar::new(pages as u64);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                            .unwrap()
                            .progress_chars("█▓░"),
                    );
                    pb.set_message("Processing pages...");
                    progress = Some(pb);
                }
                IngestEvent::PageCompleted { route, .. } => {
                    if route == Some(PageRoute::UseFallback) {
                        fallback += 1;
                    }
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }
                }
                IngestEvent::PageFailed { page, error } => {
                    failed += 1;
                    if let Some(pb) = &progress {
                        pb.println(format!(
                            "  {} page {}: {}",
                            style("!").yellow(),
                            page,
                            error
                        ));
                    }
                }
                IngestEvent::Chunked { .. } => {
                    if let Some(pb) = progress.take() {
                        pb.finish_and_clear();
                    }
                }
            }
        }
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        (fallback, failed)
    });

    let report = pipeline.run(pdf, out, event_tx).await;
    let (fallback, failed) = event_handler.await.unwrap_or((0, 0));
    let report = report?;

    report.write_outputs(out)?;
    let correction_files = export_ocr_lines(&report.units, out)?;

    let indexed = pipeline
        .index(
            &report,
            sink.as_mut(),
            match vision_sink.as_mut() {
                Some(s) => Some(s.as_mut() as &mut dyn VectorSink),
                None => None,
            },
        )
        .await?;

    println!("{} {}", style("[OK]").green(), report.summary());
    if fallback > 0 || failed > 0 {
        println!(
            "  {} {} pages used the vision fallback ({} failed recognition)",
            style("→").cyan(),
            fallback,
            failed
        );
    }
    println!(
        "  {} indexed {} chunks ({} vision) into {}",
        style("→").cyan(),
        indexed.primary,
        indexed.vision,
        sink.name()
    );
    if !correction_files.is_empty() {
        println!(
            "  {} {} correction files written to {}",
            style("→").cyan(),
            correction_files.len(),
            out.display()
        );
    }
    Ok(())
}
