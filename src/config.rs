//! Configuration types for EPUB/PDF-to-CBZ conversion.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The config is created once per run and
//! passed by reference into every stage; nothing in the pipeline mutates it.

use crate::error::Book2CbzError;
use crate::pipeline::inspect::DocumentInspector;
use crate::pipeline::rasterize::Rasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a conversion run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use book2cbz::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .min_chapters_for_split(4)
///     .chapter_page_threshold(6)
///     .overwrite_existing(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Delete the source PDF once all of its archives were written. Default: true.
    pub delete_source: bool,

    /// Delete the original EPUB once it was converted to PDF. Default: true.
    pub delete_epub: bool,

    /// Delete `.opf` metadata files once the metadata sidecar exists. Default: true.
    pub delete_opf: bool,

    /// Delete the chapters and metadata sidecars after packaging. Default: true.
    pub delete_sidecars: bool,

    /// Insert a synthetic chapter start at page 1. Default: true.
    ///
    /// Without it, pages before the first outline entry (cover, front matter)
    /// are not part of any chapter archive when the book is split.
    pub add_first_page: bool,

    /// Extract the outline into a chapters sidecar during preparation. Default: true.
    ///
    /// When off, no sidecar is written and every book becomes a single archive.
    pub extract_toc: bool,

    /// Crop near-white borders from every rendered page. Default: true.
    pub crop_margins: bool,

    /// Padding in pixels kept around the cropped content. Default: 10.
    pub crop_padding: u32,

    /// Luma value at or above which a pixel counts as background. Default: 255.
    pub background_threshold: u8,

    /// Embed a `ComicInfo.xml` in every archive. Default: true.
    pub write_comic_info: bool,

    /// Minimum distance in pages between the first chapter start and the
    /// next one kept before "chapter two". Default: 8.
    pub chapter_page_threshold: u32,

    /// Minimum number of chapter starts needed to split a book. Default: 3.
    ///
    /// The count includes the synthetic first/last page markers, so the
    /// default splits any book with at least one real chapter heading that
    /// survives filtering.
    pub min_chapters_for_split: usize,

    /// Replace archives that already exist. Default: true.
    pub overwrite_existing: bool,

    /// Strip [`archive_prefix`](Self::archive_prefix) from archive names after the run. Default: true.
    pub strip_prefix: bool,

    /// Filename prefix left by upstream library naming. Default: `"V "`.
    pub archive_prefix: String,

    /// Body font size (px) used when converting EPUB to PDF. Default: 30.
    pub font_size: u32,

    /// Rasterisation density in DPI for the ImageMagick backend. Default: 150.
    pub density: u32,

    /// Rasteriser selected when [`rasterizer`](Self::rasterizer) is `None`.
    pub backend: RasterBackend,

    /// Pre-constructed rasteriser. Takes precedence over `backend`.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Pre-constructed PDF inspector used by the preparation stage.
    /// Defaults to pdfium when `None`.
    pub inspector: Option<Arc<dyn DocumentInspector>>,

    /// Title keyword sets for chapter detection.
    pub keywords: KeywordSets,

    /// Which stages [`crate::run`] executes. Default: [`Stages::All`].
    pub stages: Stages,

    /// Progress events for UIs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delete_source: true,
            delete_epub: true,
            delete_opf: true,
            delete_sidecars: true,
            add_first_page: true,
            extract_toc: true,
            crop_margins: true,
            crop_padding: 10,
            background_threshold: 255,
            write_comic_info: true,
            chapter_page_threshold: 8,
            min_chapters_for_split: 3,
            overwrite_existing: true,
            strip_prefix: true,
            archive_prefix: "V ".to_string(),
            font_size: 30,
            density: 150,
            backend: RasterBackend::default(),
            rasterizer: None,
            inspector: None,
            keywords: KeywordSets::default(),
            stages: Stages::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("delete_source", &self.delete_source)
            .field("delete_epub", &self.delete_epub)
            .field("delete_opf", &self.delete_opf)
            .field("delete_sidecars", &self.delete_sidecars)
            .field("add_first_page", &self.add_first_page)
            .field("extract_toc", &self.extract_toc)
            .field("crop_margins", &self.crop_margins)
            .field("crop_padding", &self.crop_padding)
            .field("write_comic_info", &self.write_comic_info)
            .field("chapter_page_threshold", &self.chapter_page_threshold)
            .field("min_chapters_for_split", &self.min_chapters_for_split)
            .field("overwrite_existing", &self.overwrite_existing)
            .field("strip_prefix", &self.strip_prefix)
            .field("archive_prefix", &self.archive_prefix)
            .field("backend", &self.backend)
            .field("rasterizer", &self.rasterizer.as_ref().map(|r| r.name().to_string()))
            .field("inspector", &self.inspector.as_ref().map(|_| "<dyn DocumentInspector>"))
            .field("stages", &self.stages)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Settings for the margin cropper derived from this config.
    pub fn crop_settings(&self) -> crate::pipeline::crop::CropSettings {
        crate::pipeline::crop::CropSettings {
            enabled: self.crop_margins,
            padding: self.crop_padding,
            background_threshold: self.background_threshold,
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn delete_source(mut self, v: bool) -> Self {
        self.config.delete_source = v;
        self
    }

    pub fn delete_epub(mut self, v: bool) -> Self {
        self.config.delete_epub = v;
        self
    }

    pub fn delete_opf(mut self, v: bool) -> Self {
        self.config.delete_opf = v;
        self
    }

    pub fn delete_sidecars(mut self, v: bool) -> Self {
        self.config.delete_sidecars = v;
        self
    }

    /// Keep every input file: source, EPUB, OPF and sidecars.
    pub fn keep_inputs(self) -> Self {
        self.delete_source(false)
            .delete_epub(false)
            .delete_opf(false)
            .delete_sidecars(false)
    }

    pub fn add_first_page(mut self, v: bool) -> Self {
        self.config.add_first_page = v;
        self
    }

    pub fn extract_toc(mut self, v: bool) -> Self {
        self.config.extract_toc = v;
        self
    }

    pub fn crop_margins(mut self, v: bool) -> Self {
        self.config.crop_margins = v;
        self
    }

    pub fn crop_padding(mut self, px: u32) -> Self {
        self.config.crop_padding = px;
        self
    }

    pub fn background_threshold(mut self, luma: u8) -> Self {
        self.config.background_threshold = luma;
        self
    }

    pub fn write_comic_info(mut self, v: bool) -> Self {
        self.config.write_comic_info = v;
        self
    }

    pub fn chapter_page_threshold(mut self, pages: u32) -> Self {
        self.config.chapter_page_threshold = pages;
        self
    }

    pub fn min_chapters_for_split(mut self, n: usize) -> Self {
        self.config.min_chapters_for_split = n;
        self
    }

    pub fn overwrite_existing(mut self, v: bool) -> Self {
        self.config.overwrite_existing = v;
        self
    }

    pub fn strip_prefix(mut self, v: bool) -> Self {
        self.config.strip_prefix = v;
        self
    }

    pub fn archive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.archive_prefix = prefix.into();
        self
    }

    pub fn font_size(mut self, px: u32) -> Self {
        self.config.font_size = px.max(1);
        self
    }

    pub fn density(mut self, dpi: u32) -> Self {
        self.config.density = dpi;
        self
    }

    pub fn backend(mut self, backend: RasterBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn inspector(mut self, inspector: Arc<dyn DocumentInspector>) -> Self {
        self.config.inspector = Some(inspector);
        self
    }

    pub fn keywords(mut self, keywords: KeywordSets) -> Self {
        self.config.keywords = keywords;
        self
    }

    pub fn stages(mut self, stages: Stages) -> Self {
        self.config.stages = stages;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Book2CbzError> {
        let c = &self.config;
        if c.min_chapters_for_split == 0 {
            return Err(Book2CbzError::InvalidConfig(
                "min_chapters_for_split must be ≥ 1".into(),
            ));
        }
        if !(36..=600).contains(&c.density) {
            return Err(Book2CbzError::InvalidConfig(format!(
                "density must be 36–600 DPI, got {}",
                c.density
            )));
        }
        if c.strip_prefix && c.archive_prefix.is_empty() {
            return Err(Book2CbzError::InvalidConfig(
                "archive_prefix must not be empty when strip_prefix is enabled".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Keyword sets ─────────────────────────────────────────────────────────

/// Title keywords driving chapter detection. All keywords are matched
/// against lowercased titles, so they are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSets {
    /// Leading entries whose title starts with one of these are skipped
    /// until the first non-matching entry.
    pub ignore_leading: Vec<String>,
    /// The first entry whose title contains one of these ends the chapter list.
    pub end_markers: Vec<String>,
    /// Entries whose title contains one of these are removed.
    pub exclude: Vec<String>,
}

pub const DEFAULT_IGNORE_LEADING: &[&str] = &["title", "cover", "dedication", "title page", "contents"];

pub const DEFAULT_END_MARKERS: &[&str] = &["epilogue"];

pub const DEFAULT_EXCLUDE: &[&str] = &[
    "about the author",
    "prologue",
    "epilogue",
    "contents",
    "notes",
    "dedication",
    "acknowledgments",
    "about the publisher",
    "copyright",
];

impl Default for KeywordSets {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_LEADING, DEFAULT_END_MARKERS, DEFAULT_EXCLUDE)
    }
}

impl KeywordSets {
    /// Build keyword sets from string slices, lowercasing every keyword.
    pub fn new<S: AsRef<str>>(ignore_leading: &[S], end_markers: &[S], exclude: &[S]) -> Self {
        let lower = |v: &[S]| -> Vec<String> {
            v.iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            ignore_leading: lower(ignore_leading),
            end_markers: lower(end_markers),
            exclude: lower(exclude),
        }
    }

    /// Empty sets: every outline entry is a chapter.
    pub fn none() -> Self {
        Self {
            ignore_leading: Vec::new(),
            end_markers: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which rasteriser turns PDF pages into images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterBackend {
    /// ImageMagick 7 (`magick`) as a subprocess. (default)
    #[default]
    Magick,
    /// pdfium, in-process.
    Pdfium,
}

/// Which stages [`crate::run`] executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stages {
    /// Prepare (EPUB→PDF, sidecars), then package, then the prefix post-pass. (default)
    #[default]
    All,
    /// Only EPUB conversion and sidecar extraction.
    Prepare,
    /// Only packaging and the prefix post-pass; sidecars must already exist.
    Package,
}

impl Stages {
    pub fn runs_prepare(self) -> bool {
        matches!(self, Stages::All | Stages::Prepare)
    }

    pub fn runs_package(self) -> bool {
        matches!(self, Stages::All | Stages::Package)
    }
}
