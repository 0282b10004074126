//! Pipeline stages for book-to-CBZ conversion.
//!
//! Each submodule implements one step. Planning steps are pure functions
//! over plain data; execution steps touch the file system or run external
//! tools and are driven by the orchestrator in [`crate::convert`].
//!
//! ## Data Flow
//!
//! ```text
//!  prepare:  epub ──▶ input (ebook-convert) ──▶ pdf
//!            pdf  ──▶ inspect ──▶ outline::select_entries ──▶ sidecar (chapters.json)
//!            opf  ──▶ opf ──────────────────────────────────▶ sidecar (metadata.json)
//!
//!  package:  sidecar ──▶ outline::chapter_starts ──▶ ranges::plan_ranges
//!            per range: rasterize ──▶ crop ──▶ comicinfo + archive ──▶ .cbz
//! ```
//!
//! 1. [`outline`]   — chapter detection from a PDF outline
//! 2. [`ranges`]    — chapter starts to inclusive page ranges
//! 3. [`rasterize`] — render a range to images (ImageMagick or pdfium)
//! 4. [`crop`]      — trim white margins in place
//! 5. [`archive`]   — assemble the CBZ; [`comicinfo`] renders its XML entry
//!
//! Supporting modules: [`sidecar`] (JSON files between the two stages),
//! [`inspect`] (pdfium page count / outline / info), [`opf`] (calibre
//! metadata), [`input`] (discovery, validation, EPUB conversion) and
//! [`tool`] (subprocess plumbing).

pub mod archive;
pub mod comicinfo;
pub mod crop;
pub mod input;
pub mod inspect;
pub mod opf;
pub mod outline;
pub mod ranges;
pub mod rasterize;
pub mod sidecar;
pub mod tool;
