//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::Context;

use crate::models::Unit;

/// Truncate to `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max).collect();
        format!("{}...", kept)
    }
}

/// Single-line preview of chunk text.
pub fn preview(text: &str, max: usize) -> String {
    truncate(&text.replace('\n', " "), max)
}

pub fn read_units(path: &Path) -> anyhow::Result<Vec<Unit>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read units file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid units file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("가나다라", 2), "가나...");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(preview("a\nb", 10), "a b");
    }
}
