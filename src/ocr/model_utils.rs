//! Shared helpers for locating external OCR and PDF tools.

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

pub const PDFTOPPM_NOT_FOUND: &str = "pdftoppm not found (install poppler-utils)";
pub const PDFTOTEXT_NOT_FOUND: &str = "pdftotext not found (install poppler-utils)";
