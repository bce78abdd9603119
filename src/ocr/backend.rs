//! Recognition engine abstraction.
//!
//! An engine turns one grayscale image into word-level tokens for a given
//! language profile. The provider enum is resolved once at startup so a
//! missing dependency fails before any page is touched.

use std::sync::Arc;

use image::GrayImage;
use thiserror::Error;

use super::model_utils::check_binary;
use super::tesseract::TesseractEngine;

/// Errors from recognition and preprocessing.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Malformed recognition output: {0}")]
    MalformedOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// One recognized word.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    /// `[x0, y0, x1, y1]` in pixels.
    pub bbox: [f32; 4],
    /// Engine-native confidence (0-100). `None` is the engine's "unknown" sentinel.
    pub conf: Option<f32>,
    pub block_num: u32,
    pub par_num: u32,
    pub line_num: u32,
    /// Left-to-right position within the line.
    pub word_num: u32,
}

impl Token {
    /// Confidence mapped to [0, 1]; unknown maps to 0.
    pub fn normalized_conf(&self) -> f32 {
        match self.conf {
            Some(c) if c > 0.0 => (c / 100.0).min(1.0),
            _ => 0.0,
        }
    }

    pub fn line_key(&self) -> (u32, u32, u32) {
        (self.block_num, self.par_num, self.line_num)
    }
}

/// A language configuration the engine is run with, e.g. `kor+eng`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageProfile {
    pub language: String,
}

impl LanguageProfile {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

/// Engine-level settings shared by all profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionSettings {
    /// Page segmentation mode.
    pub psm: u8,
    /// OCR engine mode.
    pub oem: u8,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self { psm: 6, oem: 1 }
    }
}

/// Trait for recognition engines.
pub trait RecognitionEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Recognize word tokens in a grayscale image.
    fn recognize(&self, image: &GrayImage, profile: &LanguageProfile)
        -> Result<Vec<Token>, OcrError>;
}

/// Available recognition providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognitionProvider {
    /// Tesseract via command-line TSV output.
    Tesseract,
}

impl RecognitionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionProvider::Tesseract => "tesseract",
        }
    }

    pub fn parse(s: &str) -> Result<Self, OcrError> {
        match s.to_lowercase().as_str() {
            "tesseract" => Ok(RecognitionProvider::Tesseract),
            other => Err(OcrError::UnsupportedConfiguration(format!(
                "unknown recognition provider '{}'",
                other
            ))),
        }
    }

    /// Whether the provider's dependencies are installed.
    pub fn is_available(&self) -> bool {
        match self {
            RecognitionProvider::Tesseract => check_binary("tesseract"),
        }
    }

    pub fn availability_hint(&self) -> String {
        match self {
            RecognitionProvider::Tesseract => {
                "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
            }
        }
    }

    /// Construct the engine, failing immediately when its dependency is missing.
    pub fn build(
        &self,
        settings: RecognitionSettings,
    ) -> Result<Arc<dyn RecognitionEngine>, OcrError> {
        if !self.is_available() {
            return Err(OcrError::BackendNotAvailable(self.availability_hint()));
        }
        match self {
            RecognitionProvider::Tesseract => Ok(Arc::new(TesseractEngine::new(settings))),
        }
    }
}

impl std::fmt::Display for RecognitionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(conf: Option<f32>) -> Token {
        Token {
            text: "a".to_string(),
            bbox: [0.0, 0.0, 1.0, 1.0],
            conf,
            block_num: 1,
            par_num: 1,
            line_num: 1,
            word_num: 1,
        }
    }

    #[test]
    fn test_normalized_conf() {
        assert!((token(Some(96.0)).normalized_conf() - 0.96).abs() < 1e-6);
        assert_eq!(token(None).normalized_conf(), 0.0);
        assert_eq!(token(Some(-1.0)).normalized_conf(), 0.0);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            RecognitionProvider::parse("Tesseract").unwrap(),
            RecognitionProvider::Tesseract
        );
        assert!(matches!(
            RecognitionProvider::parse("dots"),
            Err(OcrError::UnsupportedConfiguration(_))
        ));
    }
}
