//! Output of the vision interpretation fallback.

use serde::{Deserialize, Serialize};

/// A key/value fact read off a figure or table image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub k: String,
    pub v: String,
}

/// A caption anchored to a region of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub bbox: [f32; 4],
    pub text: String,
}

/// Non-authoritative interpretation of a page image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionResult {
    #[serde(default)]
    pub summaries: Vec<String>,
    #[serde(default)]
    pub facts: Vec<Fact>,
    /// Subject, predicate, object.
    #[serde(default)]
    pub triples: Vec<[String; 3]>,
    #[serde(default)]
    pub captions: Vec<Caption>,
}

impl VisionResult {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
            && self.facts.is_empty()
            && self.triples.is_empty()
            && self.captions.is_empty()
    }
}
