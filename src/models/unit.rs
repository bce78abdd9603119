//! Semantic units: typed spans of one page handed to the chunker.

use serde::{Deserialize, Serialize};

/// Semantic type of a unit.
///
/// `Code` is never produced by the assembler but may arrive from an external
/// structuring step; the chunker isolates it like tables and titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Paragraph,
    Title,
    Table,
    Code,
    ListItem,
    TableRow,
    FigureSummary,
    FigureFacts,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Title => "title",
            Self::Table => "table",
            Self::Code => "code",
            Self::ListItem => "list_item",
            Self::TableRow => "table_row",
            Self::FigureSummary => "figure_summary",
            Self::FigureFacts => "figure_facts",
        }
    }

    /// Structural types always get a chunk of their own.
    pub fn is_isolated(&self) -> bool {
        matches!(self, Self::Table | Self::Code | Self::Title)
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a unit's text came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSource {
    #[default]
    Ocr,
    PdfText,
    VisionInfer,
}

impl UnitSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::PdfText => "pdf_text",
            Self::VisionInfer => "vision_infer",
        }
    }

    /// Vision interpretations are non-authoritative and indexed separately.
    pub fn is_primary(&self) -> bool {
        !matches!(self, Self::VisionInfer)
    }
}

impl std::fmt::Display for UnitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One semantic span of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub text: String,
    /// 1-based page number.
    pub page: u32,
    pub source: UnitSource,
    pub conf: f32,
    #[serde(default)]
    pub heading_path: Vec<String>,
}

impl Unit {
    pub fn new(unit_type: UnitType, text: impl Into<String>, page: u32, source: UnitSource) -> Self {
        Self {
            unit_type,
            text: text.into(),
            page,
            source,
            conf: 1.0,
            heading_path: Vec::new(),
        }
    }

    pub fn with_conf(mut self, conf: f32) -> Self {
        self.conf = conf;
        self
    }

    pub fn with_heading_path(mut self, heading_path: Vec<String>) -> Self {
        self.heading_path = heading_path;
        self
    }

    /// Overwrite the text with a human correction.
    ///
    /// Only OCR-sourced units accept corrections; returns whether the text changed.
    pub fn apply_correction(&mut self, text: &str) -> bool {
        if self.source != UnitSource::Ocr {
            return false;
        }
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_serializes_with_wire_names() {
        let unit = Unit::new(UnitType::ListItem, "항목", 2, UnitSource::PdfText)
            .with_heading_path(vec!["Ⅰ. 개요".to_string()]);
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["type"], "list_item");
        assert_eq!(json["source"], "pdf_text");
        assert_eq!(json["page"], 2);
        assert_eq!(json["heading_path"][0], "Ⅰ. 개요");
    }

    #[test]
    fn test_isolated_types() {
        assert!(UnitType::Table.is_isolated());
        assert!(UnitType::Code.is_isolated());
        assert!(UnitType::Title.is_isolated());
        assert!(!UnitType::Paragraph.is_isolated());
        assert!(!UnitType::TableRow.is_isolated());
    }

    #[test]
    fn test_correction_only_applies_to_ocr_units() {
        let mut ocr = Unit::new(UnitType::Paragraph, "teh", 1, UnitSource::Ocr);
        assert!(ocr.apply_correction("the"));
        assert_eq!(ocr.text, "the");

        let mut native = Unit::new(UnitType::Paragraph, "teh", 1, UnitSource::PdfText);
        assert!(!native.apply_correction("the"));
        assert_eq!(native.text, "teh");
    }
}
