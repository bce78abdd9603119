//! OCR trust decision.

use serde::Serialize;

/// Where a page's units come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRoute {
    UseOcr,
    UseFallback,
}

impl PageRoute {
    /// Fall back when confidence is below `threshold` or nothing was recognized.
    pub fn decide(avg_conf: f32, block_count: usize, threshold: f32) -> Self {
        if avg_conf < threshold || block_count == 0 {
            PageRoute::UseFallback
        } else {
            PageRoute::UseOcr
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageRoute::UseOcr => "ocr",
            PageRoute::UseFallback => "fallback",
        }
    }
}

impl std::fmt::Display for PageRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn should_fallback(avg_conf: f32, block_count: usize, threshold: f32) -> bool {
    PageRoute::decide(avg_conf, block_count, threshold) == PageRoute::UseFallback
}
