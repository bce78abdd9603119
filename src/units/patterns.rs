//! Line patterns and text normalization for native page text.

use std::sync::LazyLock;

use regex::Regex;

/// Roman-numeral section headings: `Ⅰ. 개요`, `II. Scope`.
static H1_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[ⅠⅡⅢⅣⅤⅥⅦⅧⅨⅩⅪⅫ]+\.|[IVX]+\.(?:\s|$))").unwrap()
});

/// Numbered sub-headings: `1. 세부`. Decimals such as `3.5` do not match.
static H2_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.(?:[^\d]|$)").unwrap());

static BULLET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*•·▪◦]\s+").unwrap());

/// Running headers/footers: `12`, `- 12 -`, `page 3`, `Page 3 of 10`, `3/10`.
static PAGE_MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:-\s*)?\d+(?:\s*-)?$|^page\s*\d+(?:\s*(?:of|/)\s*\d+)?$|^\d+\s*/\s*\d+$")
        .unwrap()
});

/// Table-of-contents titles and dotted-leader entries.
static TOC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:목\s*차|차\s*례|table\s+of\s+contents|contents)$|[.·…]{4,}\s*\d+$").unwrap()
});

/// Sentence or clause endings at the end of a line.
static SENTENCE_END_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:[.!?。！？…]|니다|한다|했다|이다|된다|있다|없다|였다|하다|같다|함|됨|임)["'”’)\]]*$"#,
    )
    .unwrap()
});

/// Sentence boundaries inside a run of text.
static SENTENCE_BOUNDARY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?。！？…]+["'”’)\]]*\s+"#).unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub fn is_h1(line: &str) -> bool {
    H1_PATTERN.is_match(line)
}

pub fn is_h2(line: &str) -> bool {
    H2_PATTERN.is_match(line)
}

/// Strip a bullet prefix, returning `None` when the line is not a bullet.
pub fn strip_bullet(line: &str) -> Option<&str> {
    BULLET_PATTERN.find(line).map(|m| &line[m.end()..])
}

pub fn is_table_row(line: &str) -> bool {
    line.contains('|')
}

pub fn is_page_marker(line: &str) -> bool {
    PAGE_MARKER_PATTERN.is_match(line)
}

pub fn is_toc_line(line: &str) -> bool {
    TOC_PATTERN.is_match(line)
}

/// Header, footer or table-of-contents noise.
pub fn is_noise(line: &str) -> bool {
    is_page_marker(line) || is_toc_line(line)
}

pub fn ends_sentence(line: &str) -> bool {
    SENTENCE_END_PATTERN.is_match(line)
}

/// Join words broken across lines with a trailing hyphen.
pub fn dehyphenate(text: &str) -> String {
    text.replace("-\r\n", "").replace("-\n", "")
}

/// Strip control characters and collapse whitespace runs to single spaces.
///
/// Whitespace controls (`\t`, `\n`, `\r`) count as whitespace; the rest are
/// dropped without leaving a gap.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    WHITESPACE_RUN.replace_all(&cleaned, " ").trim().to_string()
}

/// Split text into sentences, keeping terminal punctuation with each one.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BOUNDARY_PATTERN.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_patterns() {
        assert!(is_h1("Ⅰ. 개요"));
        assert!(is_h1("Ⅳ.추진 전략"));
        assert!(is_h1("II. Scope"));
        assert!(!is_h1("I.e. this"));
        assert!(is_h2("1. 세부"));
        assert!(is_h2("12.목표"));
        assert!(!is_h2("3.5% 증가"));
        assert!(!is_h2("2025년 계획"));
    }

    #[test]
    fn test_bullets() {
        assert_eq!(strip_bullet("- 첫째"), Some("첫째"));
        assert_eq!(strip_bullet("• second"), Some("second"));
        assert_eq!(strip_bullet("-3도"), None);
        assert_eq!(strip_bullet("본문"), None);
    }

    #[test]
    fn test_noise_lines() {
        assert!(is_noise("12"));
        assert!(is_noise("- 3 -"));
        assert!(is_noise("Page 4"));
        assert!(is_noise("page 4 of 10"));
        assert!(is_noise("3/10"));
        assert!(is_noise("목차"));
        assert!(is_noise("1. 개요 ........ 3"));
        assert!(!is_noise("2025년 예산은 3억 원이다."));
    }

    #[test]
    fn test_sentence_end() {
        assert!(ends_sentence("이 문서는 개요를 설명한다"));
        assert!(ends_sentence("The end."));
        assert!(ends_sentence("점검 결과를 보고함"));
        assert!(ends_sentence("(see above.)"));
        assert!(!ends_sentence("이 문서는"));
    }

    #[test]
    fn test_normalize_and_dehyphenate() {
        assert_eq!(dehyphenate("infor-\nmation"), "information");
        assert_eq!(normalize(" a\t\u{0007}b   c \n"), "a b c");
        assert_eq!(normalize("ab\u{0}cd"), "abcd");
        assert_eq!(normalize("표\u{1b}준\r\n안"), "표준 안");
    }

    #[test]
    fn test_split_sentences() {
        let s = split_sentences("첫 문장이다. 둘째 문장! 셋째? 넷째");
        assert_eq!(s, vec!["첫 문장이다.", "둘째 문장!", "셋째?", "넷째"]);
        assert_eq!(split_sentences("3.14 is pi"), vec!["3.14 is pi"]);
    }
}
