//! Vision interpretation and unit structuring seams.

use std::path::Path;

use crate::models::{Unit, VisionResult};

/// Non-authoritative reading of a page image.
pub trait VisionInterpreter: Send + Sync {
    fn name(&self) -> &'static str;

    fn interpret(&self, image_path: &Path) -> VisionResult;
}

/// Interpreter that reads nothing, so fallback pages contribute no units.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVision;

impl VisionInterpreter for NullVision {
    fn name(&self) -> &'static str {
        "null"
    }

    fn interpret(&self, image_path: &Path) -> VisionResult {
        tracing::debug!("no vision interpreter for {}", image_path.display());
        VisionResult::default()
    }
}

/// Structuring / summarization step between assembly and chunking.
pub trait UnitStructurer: Send + Sync {
    fn structure(&self, units: Vec<Unit>) -> Vec<Unit>;
}

/// Returns units unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl UnitStructurer for PassThrough {
    fn structure(&self, units: Vec<Unit>) -> Vec<Unit> {
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UnitSource, UnitType};

    #[test]
    fn test_null_vision_is_empty() {
        assert!(NullVision.interpret(Path::new("p0001.png")).is_empty());
    }

    #[test]
    fn test_pass_through_keeps_units() {
        let units = vec![
            Unit::new(UnitType::Title, "개요", 1, UnitSource::Ocr),
            Unit::new(UnitType::Paragraph, "본문", 1, UnitSource::Ocr),
        ];
        assert_eq!(PassThrough.structure(units.clone()), units);
    }
}
