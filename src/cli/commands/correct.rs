//! Correct command: fold human-edited OCR text back into units.

use std::path::Path;

use console::style;

use crate::corrections::apply_corrections;

use crate::cli::helpers::read_units;

pub fn cmd_correct(out: &Path, units_file: &str) -> anyhow::Result<()> {
    let mut units = read_units(&out.join(units_file))?;
    let report = apply_corrections(&mut units, out)?;

    for (page, unit_count, line_count) in &report.mismatched_pages {
        println!(
            "{} page {}: line count mismatch (units {} vs text {}), skipped",
            style("[WARN]").yellow(),
            page,
            unit_count,
            line_count
        );
    }

    let out_path = out.join("units_corrected.json");
    std::fs::write(&out_path, serde_json::to_string_pretty(&units)?)?;
    println!(
        "{} {} pages applied, {} units changed: {}",
        style("[OK]").green(),
        report.applied_pages.len(),
        report.units_changed,
        out_path.display()
    );
    Ok(())
}
