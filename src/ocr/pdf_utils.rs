//! PDF page rendering and native text extraction via Poppler tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;

use super::model_utils::{PDFTOPPM_NOT_FOUND, PDFTOTEXT_NOT_FOUND};

/// Prefix pdftoppm writes page images under inside the output directory.
const RENDER_PREFIX: &str = "render";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// One rendered page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page: u32,
    pub path: PathBuf,
    pub dpi: u32,
    pub width: u32,
    pub height: u32,
}

/// Renders PDF pages to images.
pub trait PageRenderer: Send + Sync {
    /// Render the selected pages (all pages when `pages` is `None`) into
    /// `out_dir`, returning them sorted by page number.
    fn render(
        &self,
        pdf_path: &Path,
        dpi: u32,
        out_dir: &Path,
        pages: Option<&[u32]>,
    ) -> Result<Vec<RenderedPage>, RenderError>;
}

/// Extracts embedded text from PDF pages.
pub trait NativeText: Send + Sync {
    fn page_text(&self, pdf_path: &Path, page: u32) -> Result<String, RenderError>;

    /// Text of every page, index 0 being page 1.
    fn document_text(&self, pdf_path: &Path) -> Result<Vec<String>, RenderError>;
}

/// Renderer backed by `pdftoppm`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdftoppmRenderer;

impl PdftoppmRenderer {
    fn run(&self, pdf_path: &Path, dpi: u32, out_dir: &Path, page: Option<u32>) -> Result<(), RenderError> {
        let mut cmd = Command::new("pdftoppm");
        cmd.args(["-png", "-gray", "-r", &dpi.to_string()]);
        if let Some(page) = page {
            let page_str = page.to_string();
            cmd.args(["-f", &page_str, "-l", &page_str]);
        }
        let status = cmd.arg(pdf_path).arg(out_dir.join(RENDER_PREFIX)).status();

        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(_) => Err(RenderError::RenderFailed(format!(
                "pdftoppm failed to convert {}",
                pdf_path.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RenderError::ToolNotFound(PDFTOPPM_NOT_FOUND.to_string()))
            }
            Err(e) => Err(RenderError::Io(e)),
        }
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render(
        &self,
        pdf_path: &Path,
        dpi: u32,
        out_dir: &Path,
        pages: Option<&[u32]>,
    ) -> Result<Vec<RenderedPage>, RenderError> {
        fs::create_dir_all(out_dir)?;
        // Stray render-N.png files from an earlier run must not be picked up.
        let scratch = TempDir::new_in(out_dir)?;
        match pages {
            Some(pages) => {
                for &page in pages {
                    self.run(pdf_path, dpi, scratch.path(), Some(page))?;
                }
            }
            None => self.run(pdf_path, dpi, scratch.path(), None)?,
        }

        move_rendered(scratch.path(), out_dir, dpi, pages)
    }
}

/// Move pdftoppm output from `scratch` into `out_dir` under canonical names.
fn move_rendered(
    scratch: &Path,
    out_dir: &Path,
    dpi: u32,
    pages: Option<&[u32]>,
) -> Result<Vec<RenderedPage>, RenderError> {
    let mut rendered = Vec::new();
    for (page, raw_path) in collect_rendered(scratch)? {
        if pages.is_some_and(|p| !p.contains(&page)) {
            continue;
        }
        let path = out_dir.join(page_image_name(page));
        fs::rename(&raw_path, &path)?;
        let (width, height) = image::image_dimensions(&path)?;
        rendered.push(RenderedPage {
            page,
            path,
            dpi,
            width,
            height,
        });
    }
    rendered.sort_by_key(|p| p.page);
    Ok(rendered)
}

/// Canonical page image filename, e.g. `p0001.png`.
pub fn page_image_name(page: u32) -> String {
    format!("p{:04}.png", page)
}

/// Find pdftoppm output files (`render-1.png`, `render-01.png`, ...) with their page numbers.
fn collect_rendered(out_dir: &Path) -> Result<Vec<(u32, PathBuf)>, RenderError> {
    let prefix = format!("{}-", RENDER_PREFIX);
    let mut found = Vec::new();
    for entry in fs::read_dir(out_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(page) = parse_render_page(name, &prefix) {
            found.push((page, path));
        }
    }
    Ok(found)
}

fn parse_render_page(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?
        .strip_suffix(".png")?
        .parse()
        .ok()
        .filter(|p| *p > 0)
}

/// Native text extraction backed by `pdftotext`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    fn run(&self, pdf_path: &Path, page: Option<u32>) -> Result<String, RenderError> {
        let mut cmd = Command::new("pdftotext");
        cmd.args(["-enc", "UTF-8"]);
        if let Some(page) = page {
            let page_str = page.to_string();
            cmd.args(["-f", &page_str, "-l", &page_str]);
        }
        let output = cmd.arg(pdf_path).arg("-").output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => Err(RenderError::RenderFailed(format!(
                "pdftotext failed on {}: {}",
                pdf_path.display(),
                String::from_utf8_lossy(&output.stderr)
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RenderError::ToolNotFound(PDFTOTEXT_NOT_FOUND.to_string()))
            }
            Err(e) => Err(RenderError::Io(e)),
        }
    }
}

impl NativeText for PdftotextExtractor {
    fn page_text(&self, pdf_path: &Path, page: u32) -> Result<String, RenderError> {
        self.run(pdf_path, Some(page))
    }

    fn document_text(&self, pdf_path: &Path) -> Result<Vec<String>, RenderError> {
        Ok(split_pages(&self.run(pdf_path, None)?))
    }
}

/// Split pdftotext output on its form-feed page separators.
fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\u{c}').map(String::from).collect();
    // pdftotext terminates every page, including the last, with a form feed.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_image_name() {
        assert_eq!(page_image_name(1), "p0001.png");
        assert_eq!(page_image_name(123), "p0123.png");
    }

    #[test]
    fn test_parse_render_page_padding() {
        assert_eq!(parse_render_page("render-1.png", "render-"), Some(1));
        assert_eq!(parse_render_page("render-012.png", "render-"), Some(12));
        assert_eq!(parse_render_page("render-0.png", "render-"), None);
        assert_eq!(parse_render_page("p0001.png", "render-"), None);
        assert_eq!(parse_render_page("render-2.txt", "render-"), None);
    }

    #[test]
    fn test_split_pages() {
        assert_eq!(split_pages("one\n\u{c}two\n\u{c}"), vec!["one\n", "two\n"]);
        assert_eq!(split_pages("only"), vec!["only"]);
        assert_eq!(split_pages("a\u{c}\u{c}b\u{c}"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_collect_rendered_ignores_other_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("render-02.png"), b"fake").unwrap();
        fs::write(temp.path().join("render-01.png"), b"fake").unwrap();
        fs::write(temp.path().join("units.json"), b"[]").unwrap();

        let mut found = collect_rendered(temp.path()).unwrap();
        found.sort();
        let pages: Vec<u32> = found.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn test_move_rendered_ignores_stale_output() {
        let out = TempDir::new().unwrap();
        let blank = image::GrayImage::new(4, 6);
        blank.save(out.path().join("render-3.png")).unwrap();

        let scratch = TempDir::new_in(out.path()).unwrap();
        blank.save(scratch.path().join("render-1.png")).unwrap();
        blank.save(scratch.path().join("render-2.png")).unwrap();

        let rendered = move_rendered(scratch.path(), out.path(), 150, Some(&[2u32][..])).unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].page, 2);
        assert_eq!((rendered[0].width, rendered[0].height), (4, 6));
        assert_eq!(rendered[0].path, out.path().join("p0002.png"));
        assert!(rendered[0].path.exists());
        assert!(!out.path().join("p0003.png").exists());
    }
}
