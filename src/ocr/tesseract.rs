//! Tesseract recognition engine.
//!
//! Runs the `tesseract` binary with TSV output and parses word-level rows
//! into tokens.

use std::path::Path;
use std::process::Command;

use image::{GrayImage, ImageFormat};

use super::backend::{LanguageProfile, OcrError, RecognitionEngine, RecognitionSettings, Token};

/// TSV row level for individual words.
const WORD_LEVEL: u32 = 5;

/// Tesseract recognition engine.
pub struct TesseractEngine {
    settings: RecognitionSettings,
}

impl TesseractEngine {
    pub fn new(settings: RecognitionSettings) -> Self {
        Self { settings }
    }

    fn run_tesseract(&self, image_path: &Path, language: &str) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language])
            .args(["--psm", &self.settings.psm.to_string()])
            .args(["--oem", &self.settings.oem.to_string()])
            .arg("tsv")
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(
        &self,
        image: &GrayImage,
        profile: &LanguageProfile,
    ) -> Result<Vec<Token>, OcrError> {
        let file = tempfile::Builder::new()
            .prefix("rag-ingest-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;
        let tsv = self.run_tesseract(file.path(), &profile.language)?;
        parse_tsv(&tsv)
    }
}

/// Parse tesseract TSV output into word tokens.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left, top,
/// width, height, conf, text. Non-word rows and empty words are skipped; a
/// negative confidence is the engine's "unknown" sentinel.
pub fn parse_tsv(tsv: &str) -> Result<Vec<Token>, OcrError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .from_reader(tsv.as_bytes());

    let mut tokens = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| OcrError::MalformedOutput(e.to_string()))?;
        if record.len() < 11 {
            continue;
        }
        let int = |idx: usize| -> Result<u32, OcrError> {
            record[idx].trim().parse::<i64>().map(|v| v.max(0) as u32).map_err(|_| {
                OcrError::MalformedOutput(format!("column {} is not an integer", idx))
            })
        };
        if int(0)? != WORD_LEVEL {
            continue;
        }
        let text = record.get(11).unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let left = int(6)? as f32;
        let top = int(7)? as f32;
        let width = int(8)? as f32;
        let height = int(9)? as f32;
        let conf = record[10]
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|c| *c >= 0.0);

        tokens.push(Token {
            text: text.to_string(),
            bbox: [left, top, left + width, top + height],
            conf,
            block_num: int(2)?,
            par_num: int(3)?,
            line_num: int(4)?,
            word_num: int(5)?,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t1000\t800\t-1\t
4\t1\t1\t1\t1\t0\t50\t50\t400\t30\t-1\t
5\t1\t1\t1\t1\t1\t50\t50\t100\t30\t96.5\t이\t
5\t1\t1\t1\t1\t2\t160\t50\t120\t30\t91\t문서는
5\t1\t1\t1\t1\t3\t290\t50\t40\t30\t-1\t
5\t1\t1\t1\t2\t1\t50\t90\t80\t30\t-1\tRAG
";

    #[test]
    fn test_parse_tsv_keeps_words_only() {
        let tokens = parse_tsv(SAMPLE).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "이");
        assert_eq!(tokens[0].bbox, [50.0, 50.0, 150.0, 80.0]);
        assert_eq!(tokens[0].conf, Some(96.5));
        assert_eq!(tokens[1].word_num, 2);
        assert_eq!(tokens[2].line_key(), (1, 1, 2));
    }

    #[test]
    fn test_parse_tsv_sentinel_confidence() {
        let tokens = parse_tsv(SAMPLE).unwrap();
        assert_eq!(tokens[2].conf, None);
        assert_eq!(tokens[2].normalized_conf(), 0.0);
    }

    #[test]
    fn test_parse_tsv_header_only() {
        let tokens = parse_tsv("level\tpage_num\tblock_num\n").unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_parse_tsv_rejects_garbage_numbers() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
5\t1\tx\t1\t1\t1\t0\t0\t1\t1\t90\tword
";
        assert!(matches!(parse_tsv(tsv), Err(OcrError::MalformedOutput(_))));
    }
}
