//! Spacing correction for concatenated line text.
//!
//! Line grouping concatenates tokens without separators; a corrector then
//! restores word spacing. Correctors are built once per run and shared as
//! `Arc<dyn SpacingCorrector>` across pages and variants.

use std::io::Write;
use std::process::{Command, Stdio};

use super::backend::OcrError;
use super::model_utils::check_binary;

pub trait SpacingCorrector: Send + Sync {
    fn correct(&self, text: &str) -> String;
}

/// Leaves text untouched apart from trimming.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSpacing;

impl SpacingCorrector for NoSpacing {
    fn correct(&self, text: &str) -> String {
        text.trim().to_string()
    }
}

/// Rule-based corrector.
///
/// Inserts a space where the script changes between Hangul and Latin letters
/// or digits, and after sentence or clause punctuation followed directly by a
/// letter. Runs of whitespace collapse to one space.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptBoundarySpacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Hangul,
    Latin,
    Digit,
    Other,
}

fn script_of(c: char) -> Script {
    if is_hangul(c) {
        Script::Hangul
    } else if c.is_ascii_alphabetic() {
        Script::Latin
    } else if c.is_ascii_digit() {
        Script::Digit
    } else {
        Script::Other
    }
}

fn is_hangul(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
}

fn breaks_after(c: char) -> bool {
    matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '。' | '、')
}

impl SpacingCorrector for ScriptBoundarySpacing {
    fn correct(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 8);
        let mut prev: Option<char> = None;
        for c in text.chars() {
            if c.is_whitespace() {
                if prev.is_some_and(|p| p != ' ') {
                    out.push(' ');
                    prev = Some(' ');
                }
                continue;
            }
            if let Some(p) = prev {
                let (a, b) = (script_of(p), script_of(c));
                let script_change = matches!(
                    (a, b),
                    (Script::Hangul, Script::Latin)
                        | (Script::Latin, Script::Hangul)
                        | (Script::Hangul, Script::Digit)
                );
                let after_punct = breaks_after(p) && matches!(b, Script::Hangul | Script::Latin);
                if p != ' ' && (script_change || after_punct) {
                    out.push(' ');
                }
            }
            out.push(c);
            prev = Some(c);
        }
        out.trim().to_string()
    }
}

/// Pipes each line through an external spacing model (e.g. a wrapper script
/// around a Korean spacing model), one invocation per line.
///
/// Falls back to the input text when the command fails.
pub struct CommandSpacing {
    program: String,
    args: Vec<String>,
}

impl CommandSpacing {
    /// Fails when the program is not on PATH.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Result<Self, OcrError> {
        let program = program.into();
        if !check_binary(&program) {
            return Err(OcrError::BackendNotAvailable(format!(
                "spacing command '{}' not found",
                program
            )));
        }
        Ok(Self { program, args })
    }

    fn run(&self, text: &str) -> Result<String, OcrError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::OcrFailed(format!(
                "{} failed: {}",
                self.program, stderr
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl SpacingCorrector for CommandSpacing {
    fn correct(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        match self.run(text) {
            Ok(spaced) if !spaced.is_empty() => spaced,
            Ok(_) => text.trim().to_string(),
            Err(e) => {
                tracing::debug!("spacing command failed, keeping raw text: {}", e);
                text.trim().to_string()
            }
        }
    }
}
