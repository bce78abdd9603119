//! Human correction round-trip for OCR text.
//!
//! Each page's OCR units are exported to `pNNNN.txt`, one line per unit in
//! unit order. Embedded newlines (table rows) are written as a literal `\n`
//! so the line count always matches the unit count. A corrected file is
//! applied only when its line count still matches; otherwise the page is
//! skipped with a warning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Unit, UnitSource};

const NEWLINE_ESCAPE: &str = "\\n";

/// Corrections file name for a page, e.g. `p0003.txt`.
pub fn correction_file_name(page: u32) -> String {
    format!("p{:04}.txt", page)
}

/// Outcome of applying correction files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    /// Pages whose file matched and was applied.
    pub applied_pages: Vec<u32>,
    /// Pages skipped because line counts differed: `(page, units, lines)`.
    pub mismatched_pages: Vec<(u32, usize, usize)>,
    /// Pages with OCR units but no corrections file.
    pub missing_pages: Vec<u32>,
    /// Units whose text actually changed.
    pub units_changed: usize,
}

/// Indices of OCR-sourced units grouped by page, in unit order.
fn ocr_units_by_page(units: &[Unit]) -> BTreeMap<u32, Vec<usize>> {
    let mut pages: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, unit) in units.iter().enumerate() {
        if unit.source == UnitSource::Ocr {
            pages.entry(unit.page).or_default().push(i);
        }
    }
    pages
}

/// Write one corrections file per page that has OCR units.
pub fn export_ocr_lines(units: &[Unit], out_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();
    for (page, indices) in ocr_units_by_page(units) {
        let mut body = String::new();
        for i in indices {
            body.push_str(&units[i].text.replace('\n', NEWLINE_ESCAPE));
            body.push('\n');
        }
        let path = out_dir.join(correction_file_name(page));
        fs::write(&path, body)?;
        written.push(path);
    }
    Ok(written)
}

/// Apply corrections files found in `dir` to the OCR units in place.
pub fn apply_corrections(units: &mut [Unit], dir: &Path) -> std::io::Result<CorrectionReport> {
    let mut report = CorrectionReport::default();

    for (page, indices) in ocr_units_by_page(units) {
        let path = dir.join(correction_file_name(page));
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report.missing_pages.push(page);
                continue;
            }
            Err(e) => return Err(e),
        };

        let lines: Vec<&str> = content.lines().collect();
        if lines.len() != indices.len() {
            tracing::warn!(
                "page {}: line count mismatch (units {} vs text {}), keeping OCR text",
                page,
                indices.len(),
                lines.len()
            );
            report.mismatched_pages.push((page, indices.len(), lines.len()));
            continue;
        }

        for (i, line) in indices.into_iter().zip(lines) {
            if units[i].apply_correction(&line.replace(NEWLINE_ESCAPE, "\n")) {
                report.units_changed += 1;
            }
        }
        report.applied_pages.push(page);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitType;
    use tempfile::TempDir;

    fn sample() -> Vec<Unit> {
        vec![
            Unit::new(UnitType::Title, "개요", 1, UnitSource::Ocr),
            Unit::new(UnitType::Paragraph, "본문 첫줄", 1, UnitSource::Ocr),
            Unit::new(UnitType::Paragraph, "원문", 1, UnitSource::PdfText),
            Unit::new(UnitType::Table, "| a |\n| --- |", 2, UnitSource::Ocr),
        ]
    }

    #[test]
    fn test_export_one_line_per_ocr_unit() {
        let temp = TempDir::new().unwrap();
        let written = export_ocr_lines(&sample(), temp.path()).unwrap();
        assert_eq!(written.len(), 2);

        let p1 = fs::read_to_string(temp.path().join("p0001.txt")).unwrap();
        assert_eq!(p1, "개요\n본문 첫줄\n");
        let p2 = fs::read_to_string(temp.path().join("p0002.txt")).unwrap();
        assert_eq!(p2, "| a |\\n| --- |\n");
    }

    #[test]
    fn test_apply_matching_file() {
        let temp = TempDir::new().unwrap();
        let mut units = sample();
        export_ocr_lines(&units, temp.path()).unwrap();
        fs::write(temp.path().join("p0001.txt"), "개요\n본문 첫 줄\n").unwrap();

        let report = apply_corrections(&mut units, temp.path()).unwrap();
        assert_eq!(report.applied_pages, vec![1, 2]);
        assert_eq!(report.units_changed, 1);
        assert_eq!(units[1].text, "본문 첫 줄");
        assert_eq!(units[2].text, "원문");
        assert_eq!(units[3].text, "| a |\n| --- |");
    }

    #[test]
    fn test_mismatch_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut units = sample();
        fs::write(temp.path().join("p0001.txt"), "한 줄만\n").unwrap();

        let report = apply_corrections(&mut units, temp.path()).unwrap();
        assert_eq!(report.mismatched_pages, vec![(1, 2, 1)]);
        assert_eq!(report.missing_pages, vec![2]);
        assert!(report.applied_pages.is_empty());
        assert_eq!(units[0].text, "개요");
        assert_eq!(units[1].text, "본문 첫줄");
    }
}
