//! Image preprocessing variants fed to the recognition engine.
//!
//! Variants are always produced in the same order; consensus ties are broken
//! by that order.

use image::{imageops, GrayImage};
use imageproc::contrast::adaptive_threshold;

/// Mean brightness below which a tile counts as dark-dominant.
const DARK_TILE_MEAN: f64 = 127.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Grayscale as loaded.
    Raw,
    /// Full inversion.
    Inverted,
    /// Adaptive threshold over the whole page.
    AdaptiveThreshold,
    /// Per-tile adaptive threshold whose polarity follows the tile's brightness.
    TilePolarity,
}

impl Variant {
    /// Fixed iteration order.
    pub const ALL: [Variant; 4] = [
        Variant::Raw,
        Variant::Inverted,
        Variant::AdaptiveThreshold,
        Variant::TilePolarity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Raw => "raw",
            Variant::Inverted => "inverted",
            Variant::AdaptiveThreshold => "adaptive",
            Variant::TilePolarity => "tile_polarity",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    /// Edge length of the square tiles used by [`Variant::TilePolarity`].
    pub tile_size: u32,
    /// Neighbourhood radius of the adaptive threshold.
    pub block_radius: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            tile_size: 128,
            block_radius: 15,
        }
    }
}

impl Preprocessor {
    pub fn new(tile_size: u32, block_radius: u32) -> Self {
        Self {
            tile_size: tile_size.max(1),
            block_radius,
        }
    }

    pub fn apply(&self, variant: Variant, gray: &GrayImage) -> GrayImage {
        match variant {
            Variant::Raw => gray.clone(),
            Variant::Inverted => {
                let mut out = gray.clone();
                imageops::invert(&mut out);
                out
            }
            Variant::AdaptiveThreshold => adaptive_threshold(gray, self.block_radius),
            Variant::TilePolarity => self.tile_polarity(gray),
        }
    }

    /// Threshold each tile independently, inverting dark-dominant tiles so
    /// light-on-dark regions come out as dark text on a light background.
    pub fn tile_polarity(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        let mut out = GrayImage::new(width, height);
        let step = self.tile_size;

        let mut y = 0;
        while y < height {
            let h = step.min(height - y);
            let mut x = 0;
            while x < width {
                let w = step.min(width - x);
                let tile = imageops::crop_imm(gray, x, y, w, h).to_image();
                let mut binary = adaptive_threshold(&tile, self.block_radius);
                if is_dark(&tile) {
                    imageops::invert(&mut binary);
                }
                imageops::replace(&mut out, &binary, i64::from(x), i64::from(y));
                x += step;
            }
            y += step;
        }
        out
    }
}

fn mean_brightness(image: &GrayImage) -> f64 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p.0[0])).sum();
    sum as f64 / count as f64
}

fn is_dark(tile: &GrayImage) -> bool {
    mean_brightness(tile) < DARK_TILE_MEAN
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Left half white page with dark text, right half dark box with light text.
    fn mixed_page() -> GrayImage {
        GrayImage::from_fn(256, 128, |x, y| {
            let stroke = (y % 16) < 3 && (x % 8) < 5;
            if x < 128 {
                Luma([if stroke { 20 } else { 235 }])
            } else {
                Luma([if stroke { 240 } else { 30 }])
            }
        })
    }

    #[test]
    fn test_inverted_variant() {
        let gray = GrayImage::from_pixel(4, 4, Luma([10]));
        let out = Preprocessor::default().apply(Variant::Inverted, &gray);
        assert_eq!(out.get_pixel(0, 0).0[0], 245);
    }

    #[test]
    fn test_variant_order_is_fixed() {
        assert_eq!(Variant::ALL[0], Variant::Raw);
        assert_eq!(Variant::ALL[3], Variant::TilePolarity);
    }

    #[test]
    fn test_tile_polarity_normalizes_dark_regions() {
        let page = mixed_page();
        let out = Preprocessor::new(128, 7).tile_polarity(&page);
        assert_eq!(out.dimensions(), page.dimensions());

        // Both halves should end up mostly light background.
        let left = imageops::crop_imm(&out, 0, 0, 128, 128).to_image();
        let right = imageops::crop_imm(&out, 128, 0, 128, 128).to_image();
        assert!(mean_brightness(&left) > 127.5);
        assert!(mean_brightness(&right) > 127.5);
    }

    #[test]
    fn test_tile_polarity_handles_partial_tiles() {
        let page = GrayImage::from_pixel(130, 70, Luma([200]));
        let out = Preprocessor::new(64, 3).tile_polarity(&page);
        assert_eq!(out.dimensions(), (130, 70));
    }
}
