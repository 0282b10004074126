//! Page rasterisation: render a page range of a PDF into an image directory.
//!
//! Two backends implement [`Rasterizer`]:
//!
//! - [`MagickRasterizer`] shells out to ImageMagick 7 (`magick`, which in
//!   turn needs Ghostscript for PDF input). This is the default because it
//!   matches how most comic libraries were produced and needs no native
//!   library next to the binary.
//! - [`PdfiumRasterizer`] renders in-process with pdfium-render. Faster and
//!   dependency-free at runtime once `libpdfium` is available.
//!
//! Both write `image-NNNN.<ext>` files numbered from 0 in page order, with
//! transparency composited onto white, and return the written paths sorted
//! by file name. Implementations are synchronous; the orchestrator calls
//! them from `spawn_blocking`.

use crate::config::{PipelineConfig, RasterBackend};
use crate::error::Book2CbzError;
use crate::pipeline::archive::list_images;
use crate::pipeline::crop::flatten_onto_white;
use crate::pipeline::inspect::{bind_pdfium, load_document};
use crate::pipeline::ranges::PageRange;
use crate::pipeline::tool::run_tool;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Renders a page range of a PDF into image files.
pub trait Rasterizer: Send + Sync {
    /// Short backend name for logs and reports.
    fn name(&self) -> &str;

    /// Render `range` of `source` into `out_dir` (created if absent).
    ///
    /// A range that lies entirely beyond the last page yields `Ok(vec![])`.
    fn rasterize(
        &self,
        source: &Path,
        range: PageRange,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, Book2CbzError>;
}

/// Pick the rasteriser for a run: the injected one, or the configured backend.
pub fn resolve_rasterizer(config: &PipelineConfig) -> Arc<dyn Rasterizer> {
    if let Some(r) = &config.rasterizer {
        return Arc::clone(r);
    }
    match config.backend {
        RasterBackend::Magick => Arc::new(MagickRasterizer::new(config.density)),
        RasterBackend::Pdfium => Arc::new(PdfiumRasterizer::new(config.density)),
    }
}

/// File name pattern for rendered pages (`image-0000.webp`, ...).
pub fn image_file_name(index: usize, ext: &str) -> String {
    format!("image-{:04}.{}", index, ext)
}

fn ensure_dir(dir: &Path) -> Result<(), Book2CbzError> {
    std::fs::create_dir_all(dir).map_err(|e| Book2CbzError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

// ── ImageMagick ──────────────────────────────────────────────────────────

const MAGICK_HINT: &str = "Install ImageMagick 7 (https://imagemagick.org) and Ghostscript, \
or use the pdfium backend (--backend pdfium).";

/// Rasteriser that runs ImageMagick 7 as a subprocess.
#[derive(Debug, Clone)]
pub struct MagickRasterizer {
    program: String,
    density: u32,
}

impl MagickRasterizer {
    pub fn new(density: u32) -> Self {
        Self {
            program: "magick".to_string(),
            density,
        }
    }

    /// Use a different binary name or path (e.g. a pinned ImageMagick build).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Number of pages ImageMagick sees in `source`.
    pub fn page_count(&self, source: &Path) -> Result<u32, Book2CbzError> {
        let args: Vec<OsString> = vec![
            "identify".into(),
            "-format".into(),
            "%n\n".into(),
            source.as_os_str().to_owned(),
        ];
        let output = run_tool(&self.program, &args, MAGICK_HINT)?;
        parse_page_count(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            Book2CbzError::CorruptPdf {
                path: source.to_path_buf(),
                detail: "magick identify reported no page count".to_string(),
            }
        })
    }
}

/// First integer line of `magick identify -format "%n\n"` output.
pub fn parse_page_count(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse().ok())
}

/// Arguments for rendering 1-based pages `first..=last` of `source`.
pub fn magick_args(source: &Path, first: u32, last: u32, density: u32, out_dir: &Path) -> Vec<OsString> {
    let mut input = source.as_os_str().to_owned();
    input.push(format!("[{}-{}]", first.saturating_sub(1), last.saturating_sub(1)));

    vec![
        "-density".into(),
        density.to_string().into(),
        "-background".into(),
        "white".into(),
        "-alpha".into(),
        "remove".into(),
        input,
        "-gravity".into(),
        "Center".into(),
        "-extent".into(),
        "100%x100%".into(),
        out_dir.join("image-%04d.webp").into_os_string(),
    ]
}

impl Rasterizer for MagickRasterizer {
    fn name(&self) -> &str {
        "magick"
    }

    fn rasterize(
        &self,
        source: &Path,
        range: PageRange,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, Book2CbzError> {
        ensure_dir(out_dir)?;
        let total = self.page_count(source)?;
        let Some((first, last)) = range.resolve(total) else {
            debug!("Range {} is beyond page {}, nothing to render", range, total);
            return Ok(Vec::new());
        };

        let args = magick_args(source, first, last, self.density, out_dir);
        let output = run_tool(&self.program, &args, MAGICK_HINT)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("magick: {}", stderr.trim());
        }
        list_images(out_dir)
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Rasteriser that renders in-process with pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    density: u32,
}

impl PdfiumRasterizer {
    pub fn new(density: u32) -> Self {
        Self { density }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn rasterize(
        &self,
        source: &Path,
        range: PageRange,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, Book2CbzError> {
        ensure_dir(out_dir)?;
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, source)?;
        let pages = document.pages();
        let total = pages.len() as u32;

        let Some((first, last)) = range.resolve(total) else {
            debug!("Range {} is beyond page {}, nothing to render", range, total);
            return Ok(Vec::new());
        };

        let scale = self.density as f32 / 72.0;
        let mut written = Vec::with_capacity((last - first + 1) as usize);

        for (i, page_no) in (first..=last).enumerate() {
            let page = pages
                .get((page_no - 1) as u16)
                .map_err(|e| Book2CbzError::RasterisationFailed {
                    page: page_no,
                    detail: format!("{:?}", e),
                })?;

            let render_config = PdfRenderConfig::new()
                .set_target_width((page.width().value * scale) as i32)
                .set_maximum_height((page.height().value * scale) as i32);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                Book2CbzError::RasterisationFailed {
                    page: page_no,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = DynamicImage::ImageRgb8(flatten_onto_white(&bitmap.as_image()));
            let path = out_dir.join(image_file_name(i, "webp"));
            image
                .save(&path)
                .map_err(|e| Book2CbzError::ImageFailed {
                    path: path.clone(),
                    detail: e.to_string(),
                })?;
            debug!(
                "Rendered page {} → {}x{} px",
                page_no,
                image.width(),
                image.height()
            );
            written.push(path);
        }

        Ok(written)
    }
}
