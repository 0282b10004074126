//! Margin cropping: trim near-white borders from rendered pages.
//!
//! Rendered book pages carry wide paper margins that waste screen space in
//! a comic reader. The cropper finds the bounding box of "content" pixels
//! (luma strictly below the background threshold), grows it by a fixed
//! padding, and overwrites the image in place.
//!
//! A page with no content pixels at all (a blank separator page) is left
//! untouched rather than cropped to nothing.

use crate::error::Book2CbzError;
use image::{imageops, DynamicImage, GrayImage, Rgb, RgbImage};
use std::path::Path;
use tracing::debug;

/// Cropper settings, derived from [`crate::PipelineConfig::crop_settings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSettings {
    pub enabled: bool,
    /// Pixels kept around the content box on every side.
    pub padding: u32,
    /// Luma at or above which a pixel is background.
    pub background_threshold: u8,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            padding: 10,
            background_threshold: 255,
        }
    }
}

/// What [`crop_margins`] did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropOutcome {
    /// The image was cropped to `width × height` and rewritten.
    Cropped { width: u32, height: u32 },
    /// The image already had no margin to remove; file left as-is.
    Unchanged,
    /// No content pixel was found; file left as-is.
    Blank,
    /// Cropping is turned off.
    Disabled,
}

/// Inclusive bounding box of content pixels: `(left, top, right, bottom)`.
///
/// `None` when every pixel is background.
pub fn content_bounds(luma: &GrayImage, background_threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = luma.dimensions();
    let mut left = w;
    let mut top = h;
    let mut right = 0;
    let mut bottom = 0;
    let mut found = false;

    for (x, y, px) in luma.enumerate_pixels() {
        if px.0[0] < background_threshold {
            found = true;
            left = left.min(x);
            right = right.max(x);
            top = top.min(y);
            bottom = bottom.max(y);
        }
    }

    found.then_some((left, top, right, bottom))
}

/// Grow an inclusive content box by `padding`, clamped to the image.
///
/// Returns `(x, y, width, height)` suitable for [`DynamicImage::crop_imm`].
pub fn padded_rect(
    bounds: (u32, u32, u32, u32),
    padding: u32,
    width: u32,
    height: u32,
) -> (u32, u32, u32, u32) {
    let (left, top, right, bottom) = bounds;
    let x0 = left.saturating_sub(padding);
    let y0 = top.saturating_sub(padding);
    let x1 = right.saturating_add(1).saturating_add(padding).min(width);
    let y1 = bottom.saturating_add(1).saturating_add(padding).min(height);
    (x0, y0, x1 - x0, y1 - y0)
}

/// Composite an image with transparency onto a white background.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let blend = |c: u8| -> u8 {
            let a = a as u32;
            ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
        };
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Crop the margins of the image at `path`, overwriting it in place.
///
/// The format is inferred from the file extension on both read and write.
pub fn crop_margins(path: &Path, settings: &CropSettings) -> Result<CropOutcome, Book2CbzError> {
    if !settings.enabled {
        return Ok(CropOutcome::Disabled);
    }

    let img = image::open(path).map_err(|e| image_err(path, e))?;
    let (w, h) = (img.width(), img.height());
    // Transparent pixels count as paper, not ink.
    let flat = flatten_onto_white(&img);
    let luma = imageops::grayscale(&flat);

    let Some(bounds) = content_bounds(&luma, settings.background_threshold) else {
        debug!("No content on {}, leaving uncropped", path.display());
        return Ok(CropOutcome::Blank);
    };

    let (x, y, cw, ch) = padded_rect(bounds, settings.padding, w, h);
    if (x, y, cw, ch) == (0, 0, w, h) {
        return Ok(CropOutcome::Unchanged);
    }

    let cropped = DynamicImage::ImageRgb8(imageops::crop_imm(&flat, x, y, cw, ch).to_image());
    cropped.save(path).map_err(|e| image_err(path, e))?;
    debug!("Cropped {} from {}x{} to {}x{}", path.display(), w, h, cw, ch);

    Ok(CropOutcome::Cropped {
        width: cw,
        height: ch,
    })
}

fn image_err(path: &Path, e: image::ImageError) -> Book2CbzError {
    Book2CbzError::ImageFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn page_with_block(w: u32, h: u32, block: (u32, u32, u32, u32)) -> RgbImage {
        let (bx, by, bw, bh) = block;
        RgbImage::from_fn(w, h, |x, y| {
            if x >= bx && x < bx + bw && y >= by && y < by + bh {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn bounds_of_single_block() {
        let luma = DynamicImage::ImageRgb8(page_with_block(100, 80, (30, 20, 10, 5))).to_luma8();
        assert_eq!(content_bounds(&luma, 255), Some((30, 20, 39, 24)));
    }

    #[test]
    fn blank_page_has_no_bounds() {
        let luma = GrayImage::from_pixel(20, 20, Luma([255]));
        assert_eq!(content_bounds(&luma, 255), None);
    }

    #[test]
    fn lower_threshold_ignores_light_grey() {
        let mut luma = GrayImage::from_pixel(20, 20, Luma([255]));
        luma.put_pixel(5, 5, Luma([250]));
        assert_eq!(content_bounds(&luma, 255), Some((5, 5, 5, 5)));
        assert_eq!(content_bounds(&luma, 240), None);
    }

    #[test]
    fn padding_is_clamped_to_image() {
        assert_eq!(padded_rect((30, 20, 39, 24), 10, 100, 80), (20, 10, 30, 25));
        assert_eq!(padded_rect((2, 3, 97, 78), 10, 100, 80), (0, 0, 100, 80));
        assert_eq!(padded_rect((0, 0, 0, 0), 0, 5, 5), (0, 0, 1, 1));
    }

    #[test]
    fn crops_file_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image-0000.png");
        page_with_block(100, 80, (30, 20, 10, 5)).save(&path).unwrap();

        let outcome = crop_margins(&path, &CropSettings::default()).unwrap();
        assert_eq!(outcome, CropOutcome::Cropped { width: 30, height: 25 });
        let reread = image::open(&path).unwrap();
        assert_eq!((reread.width(), reread.height()), (30, 25));
    }

    #[test]
    fn blank_file_is_left_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image-0000.png");
        RgbImage::from_pixel(40, 30, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        assert_eq!(crop_margins(&path, &CropSettings::default()).unwrap(), CropOutcome::Blank);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn disabled_does_not_touch_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.png");
        let settings = CropSettings {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(crop_margins(&path, &settings).unwrap(), CropOutcome::Disabled);
    }

    #[test]
    fn unreadable_image_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image-0000.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(
            crop_margins(&path, &CropSettings::default()),
            Err(Book2CbzError::ImageFailed { .. })
        ));
    }

    #[test]
    fn transparency_is_flattened_to_white() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }
}
