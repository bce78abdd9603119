//! Page record to semantic unit assembly.

use crate::models::{Block, BlockType, Cell, OcrPage, Unit, UnitSource, UnitType, VisionResult};

use super::patterns::{
    dehyphenate, ends_sentence, is_h1, is_h2, is_noise, is_table_row, normalize, split_sentences,
    strip_bullet,
};

/// Fixed confidence of vision interpretations.
pub const VISION_CONF: f32 = 0.6;

/// Sentences per synthetic paragraph when a page yields one giant paragraph.
const SENTENCES_PER_PARAGRAPH: usize = 2;

/// Which assembly rules apply to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssembleMode {
    Ocr,
    PdfText,
    Vision,
}

/// One page's raw recognition or extraction output.
#[derive(Debug, Clone, PartialEq)]
pub enum PageRecord {
    Ocr(OcrPage),
    PdfText(String),
    Vision(VisionResult),
}

impl PageRecord {
    pub fn mode(&self) -> AssembleMode {
        match self {
            PageRecord::Ocr(_) => AssembleMode::Ocr,
            PageRecord::PdfText(_) => AssembleMode::PdfText,
            PageRecord::Vision(_) => AssembleMode::Vision,
        }
    }
}

/// Two-level heading context.
///
/// A new `h1` clears `h2`, so the path never holds a sub-heading from an
/// earlier section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingTracker {
    h1: Option<String>,
    h2: Option<String>,
}

impl HeadingTracker {
    pub fn set_h1(&mut self, heading: impl Into<String>) {
        self.h1 = Some(heading.into());
        self.h2 = None;
    }

    pub fn set_h2(&mut self, heading: impl Into<String>) {
        self.h2 = Some(heading.into());
    }

    pub fn path(&self) -> Vec<String> {
        self.h1.iter().chain(self.h2.iter()).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnitAssembler;

impl UnitAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the ordered units of one page. `page_no` is 1-based.
    pub fn assemble(&self, record: &PageRecord, page_no: u32) -> Vec<Unit> {
        debug_assert!(page_no > 0, "page numbers are 1-based");
        match record {
            PageRecord::Ocr(page) => self.assemble_ocr(page, page_no),
            PageRecord::PdfText(text) => self.assemble_pdf_text(text, page_no),
            PageRecord::Vision(result) => self.assemble_vision(result, page_no),
        }
    }

    /// Blocks in approximate reading order (top to bottom, then left to right).
    fn assemble_ocr(&self, page: &OcrPage, page_no: u32) -> Vec<Unit> {
        let mut blocks: Vec<&Block> = page.blocks.iter().collect();
        blocks.sort_by(|a, b| {
            a.top()
                .total_cmp(&b.top())
                .then_with(|| a.left().total_cmp(&b.left()))
        });

        blocks
            .into_iter()
            .filter_map(|block| {
                let (unit_type, text) = match block.block_type {
                    BlockType::Table => (UnitType::Table, render_table(&block.cells)),
                    BlockType::Title => (UnitType::Title, clean_block_text(&block.text)),
                    BlockType::Paragraph => (UnitType::Paragraph, clean_block_text(&block.text)),
                };
                if text.is_empty() {
                    return None;
                }
                Some(
                    Unit::new(unit_type, text, page_no, UnitSource::Ocr)
                        .with_conf(block.conf.unwrap_or(page.avg_conf)),
                )
            })
            .collect()
    }

    fn assemble_pdf_text(&self, text: &str, page_no: u32) -> Vec<Unit> {
        let text = dehyphenate(text);
        let mut headings = HeadingTracker::default();
        let mut items: Vec<(UnitType, String, Vec<String>)> = Vec::new();
        let mut paragraph: Vec<String> = Vec::new();
        let mut paragraph_path: Vec<String> = Vec::new();

        fn flush(
            paragraph: &mut Vec<String>,
            path: &[String],
            items: &mut Vec<(UnitType, String, Vec<String>)>,
        ) {
            if !paragraph.is_empty() {
                let text = normalize(&paragraph.join(" "));
                items.push((UnitType::Paragraph, text, path.to_vec()));
                paragraph.clear();
            }
        }

        for raw in text.lines() {
            let line = normalize(raw);
            if line.is_empty() || is_noise(&line) {
                flush(&mut paragraph, &paragraph_path, &mut items);
                continue;
            }
            if is_h1(&line) {
                flush(&mut paragraph, &paragraph_path, &mut items);
                headings.set_h1(line);
                continue;
            }
            if is_h2(&line) {
                flush(&mut paragraph, &paragraph_path, &mut items);
                headings.set_h2(line);
                continue;
            }
            if let Some(item) = strip_bullet(&line) {
                flush(&mut paragraph, &paragraph_path, &mut items);
                items.push((UnitType::ListItem, item.trim().to_string(), headings.path()));
                continue;
            }
            if is_table_row(&line) {
                flush(&mut paragraph, &paragraph_path, &mut items);
                items.push((UnitType::TableRow, line, headings.path()));
                continue;
            }

            if paragraph.is_empty() {
                paragraph_path = headings.path();
            }
            let terminal = ends_sentence(&line);
            paragraph.push(line);
            if terminal {
                flush(&mut paragraph, &paragraph_path, &mut items);
            }
        }
        flush(&mut paragraph, &paragraph_path, &mut items);

        resplit_single_paragraph(&mut items);

        items
            .into_iter()
            .filter(|(_, text, _)| !text.is_empty() && !is_noise(text))
            .map(|(unit_type, text, path)| {
                Unit::new(unit_type, text, page_no, UnitSource::PdfText).with_heading_path(path)
            })
            .collect()
    }

    fn assemble_vision(&self, result: &VisionResult, page_no: u32) -> Vec<Unit> {
        let mut units = Vec::new();
        if !result.summaries.is_empty() {
            units.push(
                Unit::new(
                    UnitType::FigureSummary,
                    result.summaries.join(" "),
                    page_no,
                    UnitSource::VisionInfer,
                )
                .with_conf(VISION_CONF),
            );
        }
        if !result.facts.is_empty() || !result.triples.is_empty() {
            units.push(
                Unit::new(
                    UnitType::FigureFacts,
                    render_facts(result),
                    page_no,
                    UnitSource::VisionInfer,
                )
                .with_conf(VISION_CONF),
            );
        }
        units
    }
}

/// When a page produced exactly one paragraph spanning several sentences,
/// regroup its sentences in pairs.
fn resplit_single_paragraph(items: &mut Vec<(UnitType, String, Vec<String>)>) {
    let mut paragraphs = items
        .iter()
        .enumerate()
        .filter(|(_, (t, _, _))| *t == UnitType::Paragraph);
    let (Some((idx, _)), None) = (paragraphs.next(), paragraphs.next()) else {
        return;
    };

    let sentences = split_sentences(&items[idx].1);
    if sentences.len() <= SENTENCES_PER_PARAGRAPH {
        return;
    }
    let path = items[idx].2.clone();
    let regrouped: Vec<_> = sentences
        .chunks(SENTENCES_PER_PARAGRAPH)
        .map(|pair| (UnitType::Paragraph, pair.join(" "), path.clone()))
        .collect();
    items.splice(idx..=idx, regrouped);
}

/// Join wrapped lines and trim a block's text.
fn clean_block_text(text: &str) -> String {
    dehyphenate(text).replace('\n', " ").trim().to_string()
}

/// Render a cell grid as a pipe-delimited markdown table.
///
/// The first row is the header. An empty grid (or empty header row) renders
/// as an empty string.
pub fn render_table(cells: &[Vec<Cell>]) -> String {
    let Some(header) = cells.first().filter(|row| !row.is_empty()) else {
        return String::new();
    };
    let render_row = |row: &[Cell]| {
        let texts: Vec<String> = row
            .iter()
            .map(|c| c.text.replace('\n', " ").trim().to_string())
            .collect();
        format!("| {} |", texts.join(" | "))
    };

    let mut lines = Vec::with_capacity(cells.len() + 1);
    lines.push(render_row(header));
    lines.push(format!("| {} |", vec!["---"; header.len()].join(" | ")));
    lines.extend(cells[1..].iter().map(|row| render_row(row)));
    lines.join("\n")
}

/// Deterministic text form of vision facts and triples.
fn render_facts(result: &VisionResult) -> String {
    let facts: Vec<String> = result
        .facts
        .iter()
        .map(|f| format!("{}: {}", f.k, f.v))
        .collect();
    let triples: Vec<String> = result
        .triples
        .iter()
        .map(|[s, p, o]| format!("({}, {}, {})", s, p, o))
        .collect();
    format!("facts=[{}]; triples=[{}]", facts.join(", "), triples.join(", "))
}
