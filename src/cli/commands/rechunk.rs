//! Rechunk command.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::chunking::{segment, units_from_chunk, StoredChunks};

pub fn cmd_rechunk(
    meta: &Path,
    out: &Path,
    max_chars: usize,
    min_chars: usize,
    overlap: usize,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(meta)
        .with_context(|| format!("Failed to read {}", meta.display()))?;
    let stored: StoredChunks = serde_json::from_str(&raw)
        .with_context(|| format!("{} is neither a chunk list nor sink metadata", meta.display()))?;

    let units: Vec<_> = stored.into_vec().iter().flat_map(units_from_chunk).collect();
    let chunks = segment(&units, max_chars, min_chars, overlap);

    std::fs::write(out, serde_json::to_string_pretty(&chunks)?)?;
    println!(
        "{} Wrote {} chunks ({} units) → {}",
        style("[INFO]").cyan(),
        chunks.len(),
        units.len(),
        out.display()
    );
    Ok(())
}
