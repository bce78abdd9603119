//! Token-to-line grouping.

use std::collections::BTreeMap;

use super::backend::Token;
use super::spacing::SpacingCorrector;

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub text: String,
    /// Union of the constituent token boxes.
    pub bbox: [f32; 4],
    /// Mean token confidence in [0, 1].
    pub conf: f32,
}

/// Group tokens by (block, paragraph, line), order each group left to right
/// and build line text without inserting separators before spacing correction.
///
/// Lines whose corrected text is empty are dropped.
pub fn group_lines(tokens: &[Token], spacing: &dyn SpacingCorrector) -> Vec<OcrLine> {
    let mut groups: BTreeMap<(u32, u32, u32), Vec<&Token>> = BTreeMap::new();
    for token in tokens {
        groups.entry(token.line_key()).or_default().push(token);
    }

    groups
        .into_values()
        .filter_map(|mut group| {
            group.sort_by_key(|t| t.word_num);
            let raw: String = group.iter().map(|t| t.text.as_str()).collect();
            let text = spacing.correct(&raw);
            if text.is_empty() {
                return None;
            }
            let conf =
                group.iter().map(|t| t.normalized_conf()).sum::<f32>() / group.len() as f32;
            Some(OcrLine {
                text,
                bbox: union_bbox(group.iter().map(|t| t.bbox)),
                conf,
            })
        })
        .collect()
}

/// Mean line confidence, 0 for no lines.
pub fn mean_conf(lines: &[OcrLine]) -> f32 {
    if lines.is_empty() {
        return 0.0;
    }
    lines.iter().map(|l| l.conf).sum::<f32>() / lines.len() as f32
}

fn union_bbox(boxes: impl Iterator<Item = [f32; 4]>) -> [f32; 4] {
    boxes
        .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])])
        .unwrap_or([0.0; 4])
}
