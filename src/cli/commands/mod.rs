//! CLI parser and dispatch to command modules.

mod check;
mod correct;
mod ingest;
mod rechunk;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, CONFIG_ENV};
use crate::pipeline::IngestMode;

#[derive(Parser)]
#[command(name = "rag-ingest")]
#[command(about = "Turn PDF pages into retrieval-ready chunks")]
#[command(version)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Page text source override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ModeArg {
    Ocr,
    PdfText,
}

impl From<ModeArg> for IngestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Ocr => IngestMode::Ocr,
            ModeArg::PdfText => IngestMode::PdfText,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a PDF: extract pages, assemble units, chunk, embed and index
    Ingest {
        /// Input PDF path
        #[arg(long)]
        pdf: PathBuf,
        /// Output directory (page images, units.json, chunks.json, correction files)
        #[arg(long, default_value = "./out")]
        out: PathBuf,
        /// Page text source (default: pipeline.mode from config)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Number of page workers (default: pipeline.workers from config)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Only process these 1-based pages (comma-separated)
        #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u32).range(1..))]
        pages: Option<Vec<u32>>,
    },

    /// Apply human-edited pNNNN.txt files to OCR units
    Correct {
        /// Directory holding the ingest output
        #[arg(long, default_value = "./out")]
        out: PathBuf,
        /// Units file name inside the output directory
        #[arg(long, default_value = "units.json")]
        units: String,
    },

    /// Re-split stored chunks into line units and segment them again
    Rechunk {
        /// Existing chunk list or sink metadata file
        #[arg(long)]
        meta: PathBuf,
        /// Output path
        #[arg(long, default_value = "meta_rechunk.json")]
        out: PathBuf,
        /// Maximum chunk length in characters
        #[arg(long, default_value = "800")]
        max_chars: usize,
        /// Minimum chunk length before a flush is allowed
        #[arg(long, default_value = "300")]
        min_chars: usize,
        /// Overlap characters carried into the next chunk
        #[arg(long, default_value = "80")]
        overlap: usize,
    },

    /// Search the configured index
    Search {
        /// Query text
        #[arg(long)]
        query: String,
        /// Number of results
        #[arg(short, long, default_value = "5")]
        k: usize,
        /// Drop hits less similar than this score
        #[arg(long)]
        threshold: Option<f32>,
        /// Only show hits containing at least one query term
        #[arg(long)]
        match_terms: bool,
    },

    /// Show index size, dimension and a sample item
    Info,

    /// Check that the required external tools are installed
    Check,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Ingest {
            pdf,
            out,
            mode,
            workers,
            pages,
        } => {
            if let Some(workers) = workers {
                config.pipeline.workers = workers.max(1);
            }
            let mode = mode.map(IngestMode::from).unwrap_or(config.pipeline.mode);
            ingest::cmd_ingest(&config, &pdf, &out, mode, pages).await
        }
        Commands::Correct { out, units } => correct::cmd_correct(&out, &units),
        Commands::Rechunk {
            meta,
            out,
            max_chars,
            min_chars,
            overlap,
        } => rechunk::cmd_rechunk(&meta, &out, max_chars, min_chars, overlap),
        Commands::Search {
            query,
            k,
            threshold,
            match_terms,
        } => search::cmd_search(&config, &query, k, threshold, match_terms).await,
        Commands::Info => search::cmd_info(&config),
        Commands::Check => check::cmd_check(&config),
    }
}
