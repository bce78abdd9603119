//! Multi-variant OCR consensus.
//!
//! Every preprocessing variant is recognized once per language profile. Each
//! profile keeps its best-scoring variant, then the per-profile results are
//! merged line by line.
//!
//! The merge pairs lines by index, not by position or text. It assumes both
//! profiles segment the page into the same lines; when one profile splits or
//! joins lines differently the pairing drifts.

use std::path::Path;
use std::sync::Arc;

use image::GrayImage;
use rayon::prelude::*;

use crate::models::{Block, BlockType, OcrPage};

use super::backend::{LanguageProfile, OcrError, RecognitionEngine};
use super::lines::{group_lines, mean_conf, OcrLine};
use super::preprocess::{Preprocessor, Variant};
use super::spacing::SpacingCorrector;

/// Lines recognized from one variant under one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub variant: Variant,
    pub lines: Vec<OcrLine>,
    pub mean_conf: f32,
}

impl Candidate {
    pub fn new(variant: Variant, lines: Vec<OcrLine>) -> Self {
        let mean_conf = mean_conf(&lines);
        Self {
            variant,
            lines,
            mean_conf,
        }
    }
}

/// Pick the candidate with the highest mean confidence; ties keep the first seen.
pub fn best_for_lang(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.mean_conf <= current.mean_conf => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Merge two profiles' lines index by index.
///
/// Where both have a line the more confident one wins, ties favouring
/// `first`. Where only one has a line it is kept as is.
pub fn merge_by_index(first: Vec<OcrLine>, second: Vec<OcrLine>) -> Vec<OcrLine> {
    let len = first.len().max(second.len());
    let mut first = first.into_iter();
    let mut second = second.into_iter();
    let mut merged = Vec::with_capacity(len);
    for _ in 0..len {
        match (first.next(), second.next()) {
            (Some(a), Some(b)) => merged.push(if b.conf > a.conf { b } else { a }),
            (Some(a), None) => merged.push(a),
            (None, Some(b)) => merged.push(b),
            (None, None) => break,
        }
    }
    merged
}

pub struct OcrConsensusEngine {
    engine: Arc<dyn RecognitionEngine>,
    spacing: Arc<dyn SpacingCorrector>,
    preprocessor: Preprocessor,
    profiles: Vec<LanguageProfile>,
}

impl OcrConsensusEngine {
    /// The first profile is the mixed one and wins merge ties.
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        spacing: Arc<dyn SpacingCorrector>,
        preprocessor: Preprocessor,
        profiles: Vec<LanguageProfile>,
    ) -> Result<Self, OcrError> {
        if profiles.is_empty() {
            return Err(OcrError::UnsupportedConfiguration(
                "at least one language profile is required".to_string(),
            ));
        }
        Ok(Self {
            engine,
            spacing,
            preprocessor,
            profiles,
        })
    }

    pub fn profiles(&self) -> &[LanguageProfile] {
        &self.profiles
    }

    /// Recognize one page image from disk.
    pub fn run(&self, image_path: &Path, page: u32) -> Result<OcrPage, OcrError> {
        let gray = image::open(image_path)?.to_luma8();
        self.run_image(&gray, page)
    }

    pub fn run_image(&self, gray: &GrayImage, page: u32) -> Result<OcrPage, OcrError> {
        let variants: Vec<(Variant, GrayImage)> = Variant::ALL
            .as_slice()
            .par_iter()
            .map(|v| (*v, self.preprocessor.apply(*v, gray)))
            .collect();

        let jobs: Vec<(usize, usize)> = (0..self.profiles.len())
            .flat_map(|p| (0..variants.len()).map(move |v| (p, v)))
            .collect();

        let results: Vec<(usize, Result<Candidate, OcrError>)> = jobs
            .par_iter()
            .map(|&(p, v)| {
                let (variant, image) = &variants[v];
                let profile = &self.profiles[p];
                let result = self
                    .engine
                    .recognize(image, profile)
                    .map(|tokens| Candidate::new(*variant, group_lines(&tokens, &*self.spacing)));
                (p, result)
            })
            .collect();

        let mut first_error: Option<OcrError> = None;
        let mut per_profile: Vec<Vec<Candidate>> = vec![Vec::new(); self.profiles.len()];
        for (p, result) in results {
            match result {
                Ok(candidate) => {
                    tracing::debug!(
                        "page {} profile {} variant {}: {} lines, mean conf {:.3}",
                        page,
                        self.profiles[p].language,
                        candidate.variant,
                        candidate.lines.len(),
                        candidate.mean_conf
                    );
                    per_profile[p].push(candidate);
                }
                Err(e) => {
                    tracing::debug!(
                        "page {} profile {} recognition failed: {}",
                        page,
                        self.profiles[p].language,
                        e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        if per_profile.iter().all(|c| c.is_empty()) {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let merged = per_profile
            .into_iter()
            .filter_map(best_for_lang)
            .map(|best| best.lines)
            .reduce(merge_by_index)
            .unwrap_or_default();

        Ok(lines_to_page(page, merged, &self.profiles[0].language))
    }
}

fn lines_to_page(page: u32, lines: Vec<OcrLine>, lang: &str) -> OcrPage {
    let blocks = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| Block {
            id: format!("l{}", i + 1),
            block_type: BlockType::Paragraph,
            bbox: line.bbox,
            text: line.text,
            conf: Some(line.conf),
            cells: Vec::new(),
        })
        .collect();
    OcrPage::from_blocks(page, blocks, lang)
}
