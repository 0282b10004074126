//! CLI binary for book2cbz.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use book2cbz::pipeline::outline::{build_chapter_list, OutlineNode};
use book2cbz::{
    inspect, run, KeywordSets, PipelineConfig, PipelineProgressCallback, ProgressCallback,
    RasterBackend, RunSummary, Stages,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the documents of the run and a
/// log line per chapter archive.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the range being rendered.
    range_started: Mutex<Option<Instant>>,
    range_errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner only until `on_run_start` tells us how many documents there are.
    /// The preparation stage runs under this spinner.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Converting EPUBs and reading outlines…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            range_started: Mutex::new(None),
            range_errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} books  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Packaging");
        self.bar.reset_eta();
    }

    fn range_elapsed(&self) -> f64 {
        self.range_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Packaging {total_documents} books…"))
        ));
    }

    fn on_document_start(&self, doc: &str, _index: usize, ranges: usize) {
        self.bar.set_message(doc.to_string());
        self.bar.println(format!(
            "{} {}  {}",
            cyan("▸"),
            bold(doc),
            dim(&format!("{ranges} archive(s)"))
        ));
    }

    fn on_range_start(&self, _doc: &str, chapter: usize, total_chapters: usize) {
        if let Ok(mut t) = self.range_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar
            .set_message(format!("chapter {chapter}/{total_chapters}"));
    }

    fn on_range_complete(&self, _doc: &str, chapter: usize, total: usize, images: usize) {
        let elapsed = self.range_elapsed();
        let detail = if images == 0 {
            dim("skipped")
        } else {
            dim(&format!("{images:>4} pages"))
        };
        self.bar.println(format!(
            "  {} Chapter {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            chapter,
            total,
            detail,
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_range_error(&self, _doc: &str, chapter: usize, total: usize, error: &str) {
        let elapsed = self.range_elapsed();
        self.range_errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Chapter {:>3}/{:<3}  {}  {}",
            red("✗"),
            chapter,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_document_complete(&self, _doc: &str, _archives: usize, _failed: bool) {
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_documents: usize, failed_documents: usize) {
        self.bar.finish_and_clear();
        let range_errors = self.range_errors.load(Ordering::SeqCst);

        if failed_documents == 0 && range_errors == 0 {
            eprintln!(
                "{} {} books packaged successfully",
                green("✔"),
                bold(&total_documents.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} books packaged  ({} failed books, {} failed chapters)",
                cyan("⚠"),
                bold(&(total_documents - failed_documents).to_string()),
                total_documents,
                red(&failed_documents.to_string()),
                red(&range_errors.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every EPUB/PDF under the current directory
  book2cbz

  # A specific library, keeping every input file
  book2cbz ~/Books --keep-inputs

  # Only extract chapter and metadata sidecars (review them, then package)
  book2cbz ~/Books --stage prepare
  book2cbz ~/Books --stage package

  # Render in-process with pdfium instead of ImageMagick
  book2cbz ~/Books --backend pdfium --density 200

  # Show what the chapter detector sees in one PDF
  book2cbz --inspect-only "V Dune.pdf"

  # Machine-readable run summary
  book2cbz ~/Books --json --no-progress > run.json

OUTPUT:
  "<name>.pdf" with 3+ detected chapters  →  "<name> Chapter 1.cbz", "<name> Chapter 2.cbz", …
  otherwise                              →  "<name>.cbz"
  A leading "V " is stripped from archive names after packaging (--keep-prefix to disable).

EXTERNAL TOOLS:
  ebook-convert   calibre, for EPUB input
  magick          ImageMagick 7 + Ghostscript, default render backend
  libpdfium       outlines, PDF info and --backend pdfium

ENVIRONMENT VARIABLES:
  BOOK2CBZ_*        Every flag has an env var, e.g. BOOK2CBZ_DENSITY=200
  PDFIUM_LIB_PATH   Directory containing libpdfium
  RUST_LOG          Overrides the log filter (e.g. book2cbz=debug)
"#;

/// Convert EPUB and PDF books into per-chapter CBZ archives.
#[derive(clap::Parser, Debug)]
#[command(
    name = "book2cbz",
    version,
    about = "Convert EPUB and PDF books into per-chapter CBZ archives",
    long_about = "Convert a folder of EPUB and PDF books into comic-reader archives. Chapters are \
detected from the PDF outline; each chapter is rasterised, cropped of white margins and packed \
into a CBZ with a ComicInfo.xml built from the book's metadata.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Library folder to process.
    #[arg(default_value = ".", env = "BOOK2CBZ_DIR")]
    dir: PathBuf,

    /// Stages to run: all, prepare, package.
    #[arg(long, env = "BOOK2CBZ_STAGE", value_enum, default_value = "all")]
    stage: StageArg,

    /// Rasteriser: magick (ImageMagick subprocess) or pdfium (in-process).
    #[arg(long, env = "BOOK2CBZ_BACKEND", value_enum, default_value = "magick")]
    backend: BackendArg,

    /// Render density in DPI (36–600).
    #[arg(long, env = "BOOK2CBZ_DENSITY", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    density: u32,

    /// Default font size used when converting EPUBs.
    #[arg(long, env = "BOOK2CBZ_FONT_SIZE", default_value_t = 30)]
    font_size: u32,

    // ── Chapter detection ────────────────────────────────────────────────
    /// Chapters closer than this many pages to the previous one are dropped.
    #[arg(long, env = "BOOK2CBZ_CHAPTER_PAGE_THRESHOLD", default_value_t = 8)]
    chapter_page_threshold: u32,

    /// Minimum chapter starts needed to split a book.
    #[arg(long, env = "BOOK2CBZ_MIN_CHAPTERS", default_value_t = 3)]
    min_chapters: usize,

    /// Don't insert a synthetic "First Page" entry at page 1.
    #[arg(long, env = "BOOK2CBZ_NO_FIRST_PAGE")]
    no_first_page: bool,

    /// Don't extract chapter sidecars from PDF outlines.
    #[arg(long, env = "BOOK2CBZ_NO_TOC")]
    no_toc: bool,

    /// Leading outline titles to skip (comma-separated, replaces the defaults).
    #[arg(long, env = "BOOK2CBZ_IGNORE_LEADING", value_delimiter = ',')]
    ignore_leading: Option<Vec<String>>,

    /// Titles that end the chapter list (comma-separated, replaces the defaults).
    #[arg(long, env = "BOOK2CBZ_END_MARKERS", value_delimiter = ',')]
    end_markers: Option<Vec<String>>,

    /// Titles dropped from the chapter list (comma-separated, replaces the defaults).
    #[arg(long, env = "BOOK2CBZ_EXCLUDE", value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    // ── Images ───────────────────────────────────────────────────────────
    /// Don't crop white margins.
    #[arg(long, env = "BOOK2CBZ_NO_CROP")]
    no_crop: bool,

    /// Pixels kept around the content when cropping.
    #[arg(long, env = "BOOK2CBZ_CROP_PADDING", default_value_t = 10)]
    crop_padding: u32,

    /// Luma at or above which a pixel counts as background (0–255).
    #[arg(long, env = "BOOK2CBZ_BACKGROUND_THRESHOLD", default_value_t = 255)]
    background_threshold: u8,

    /// Don't add ComicInfo.xml to archives.
    #[arg(long, env = "BOOK2CBZ_NO_COMIC_INFO")]
    no_comic_info: bool,

    // ── Outputs ──────────────────────────────────────────────────────────
    /// Keep existing archives instead of overwriting them.
    #[arg(long, env = "BOOK2CBZ_NO_OVERWRITE")]
    no_overwrite: bool,

    /// Don't strip the prefix from archive names after packaging.
    #[arg(long, env = "BOOK2CBZ_KEEP_PREFIX")]
    keep_prefix: bool,

    /// Archive name prefix stripped after packaging.
    #[arg(long, env = "BOOK2CBZ_PREFIX", default_value = "V ")]
    prefix: String,

    // ── Cleanup ──────────────────────────────────────────────────────────
    /// Keep every input file (source PDFs, EPUBs, OPFs, sidecars).
    #[arg(long, env = "BOOK2CBZ_KEEP_INPUTS")]
    keep_inputs: bool,

    /// Keep source PDFs after packaging.
    #[arg(long, env = "BOOK2CBZ_KEEP_SOURCE")]
    keep_source: bool,

    /// Keep EPUBs after conversion.
    #[arg(long, env = "BOOK2CBZ_KEEP_EPUB")]
    keep_epub: bool,

    /// Keep OPF files after the metadata sidecar is written.
    #[arg(long, env = "BOOK2CBZ_KEEP_OPF")]
    keep_opf: bool,

    /// Keep chapter and metadata sidecars after packaging.
    #[arg(long, env = "BOOK2CBZ_KEEP_SIDECARS")]
    keep_sidecars: bool,

    // ── Reporting ────────────────────────────────────────────────────────
    /// Print a PDF's page count, outline and chapter starts, then exit.
    #[arg(long, value_name = "PDF")]
    inspect_only: Option<PathBuf>,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "BOOK2CBZ_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BOOK2CBZ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BOOK2CBZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BOOK2CBZ_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StageArg {
    All,
    Prepare,
    Package,
}

impl From<StageArg> for Stages {
    fn from(v: StageArg) -> Self {
        match v {
            StageArg::All => Stages::All,
            StageArg::Prepare => Stages::Prepare,
            StageArg::Package => Stages::Package,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Magick,
    Pdfium,
}

impl From<BackendArg> for RasterBackend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Magick => RasterBackend::Magick,
            BackendArg::Pdfium => RasterBackend::Pdfium,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = <Cli as clap::Parser>::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inspect_only.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if let Some(ref pdf) = cli.inspect_only {
        let config = build_config(&cli, None)?;
        return print_inspection(pdf, &config, cli.json).await;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let cli_cb = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn PipelineProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = run(&cli.dir, &config).await;
    // A prepare-only run never reaches the packaging callbacks.
    if let Some(cb) = &cli_cb {
        if !cb.bar.is_finished() {
            cb.bar.finish_and_clear();
        }
    }
    let summary =
        result.with_context(|| format!("Cannot process library '{}'", cli.dir.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let defaults = KeywordSets::default();
    let keywords = KeywordSets::new(
        cli.ignore_leading.as_deref().unwrap_or(&defaults.ignore_leading),
        cli.end_markers.as_deref().unwrap_or(&defaults.end_markers),
        cli.exclude.as_deref().unwrap_or(&defaults.exclude),
    );

    let mut builder = PipelineConfig::builder()
        .stages(cli.stage.into())
        .backend(cli.backend.into())
        .density(cli.density)
        .font_size(cli.font_size)
        .chapter_page_threshold(cli.chapter_page_threshold)
        .min_chapters_for_split(cli.min_chapters)
        .add_first_page(!cli.no_first_page)
        .extract_toc(!cli.no_toc)
        .keywords(keywords)
        .crop_margins(!cli.no_crop)
        .crop_padding(cli.crop_padding)
        .background_threshold(cli.background_threshold)
        .write_comic_info(!cli.no_comic_info)
        .overwrite_existing(!cli.no_overwrite)
        .strip_prefix(!cli.keep_prefix)
        .archive_prefix(cli.prefix.clone())
        .delete_source(!cli.keep_source)
        .delete_epub(!cli.keep_epub)
        .delete_opf(!cli.keep_opf)
        .delete_sidecars(!cli.keep_sidecars);

    if cli.keep_inputs {
        builder = builder.keep_inputs();
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn print_inspection(pdf: &Path, config: &PipelineConfig, json: bool) -> Result<()> {
    let info = inspect(pdf)
        .await
        .with_context(|| format!("Failed to inspect '{}'", pdf.display()))?;
    let starts = build_chapter_list(&info.outline, info.page_count, config);

    if json {
        let value = serde_json::json!({
            "file": pdf,
            "inspection": info,
            "chapter_starts": starts,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise inspection")?
        );
        return Ok(());
    }

    println!("File:         {}", pdf.display());
    if let Some(ref t) = info.info.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = info.info.author {
        println!("Author:       {}", a);
    }
    println!("Pages:        {}", info.page_count);
    println!("Outline:");
    if info.outline.is_empty() {
        println!("  (none)");
    }
    print_outline(&info.outline, 1);
    println!("Chapters:     {:?}", starts);
    Ok(())
}

fn print_outline(nodes: &[OutlineNode], depth: usize) {
    for node in nodes {
        let page = node
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}{:>5}  {}", "  ".repeat(depth), page, node.title);
        print_outline(&node.children, depth + 1);
    }
}

fn print_summary(summary: &RunSummary) {
    if let Some(ref prep) = summary.prepare {
        eprintln!(
            "{}  {} EPUBs converted, {} chapter and {} metadata sidecars written",
            dim("prepare"),
            prep.epubs_converted,
            prep.chapter_sidecars_written,
            prep.metadata_sidecars_written
        );
        for issue in &prep.issues {
            eprintln!("  {} {}  {}", cyan("⚠"), issue.path.display(), dim(&issue.error));
        }
    }

    let s = &summary.stats;
    eprintln!(
        "{}  {} archives written, {} kept, {} renamed  {}",
        if summary.has_failures() {
            cyan("⚠")
        } else {
            green("✔")
        },
        bold(&s.archives_written.to_string()),
        s.archives_skipped,
        s.archives_renamed,
        dim(&format!("{}ms", s.total_duration_ms)),
    );
    for doc in summary.documents.iter().filter(|d| d.is_failed()) {
        eprintln!("  {} {}  {:?}", red("✗"), doc.source.display(), doc.outcome);
    }
    if s.ranges_failed > 0 {
        eprintln!(
            "  {} chapters failed; their sources were kept",
            red(&s.ranges_failed.to_string())
        );
    }
}
