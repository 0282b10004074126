//! Report types returned by the preparation and packaging stages.
//!
//! Everything here is plain data and `Serialize`, so the CLI can print a
//! run as JSON (`--json`) and library callers can persist or inspect it.

use crate::error::RangeError;
use crate::pipeline::ranges::PageRange;
use serde::Serialize;
use std::path::PathBuf;

// ── Per range ────────────────────────────────────────────────────────────

/// What happened to one chapter range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RangeOutcome {
    /// An archive was written.
    Written { images: usize, bytes: u64 },
    /// The target already existed and overwriting is off; nothing was rendered.
    SkippedExisting,
    /// Rasterisation produced no images; no archive was created.
    Empty,
    /// The range failed; see the error.
    Failed { error: RangeError },
}

/// One chapter range of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport {
    /// 1-based chapter number.
    pub chapter: usize,
    pub range: PageRange,
    /// Archive path this range writes (or would have written).
    pub archive: PathBuf,
    pub outcome: RangeOutcome,
}

impl RangeReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RangeOutcome::Failed { .. })
    }

    pub fn is_written(&self) -> bool {
        matches!(self.outcome, RangeOutcome::Written { .. })
    }
}

// ── Per document ─────────────────────────────────────────────────────────

/// Lifecycle of one document through the packaging stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Discovered,
    InfoLoaded,
    SplitPlanned,
    SinglePlanned,
    RangesProcessed,
    Cleaned,
    Done,
    Failed,
}

/// Final outcome of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DocumentOutcome {
    Done,
    /// Nothing to do (e.g. the source vanished before packaging).
    Skipped { reason: String },
    /// Processing stopped in `state`.
    Failed { state: DocumentState, reason: String },
}

/// Everything that happened to one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    /// Last state reached.
    pub state: DocumentState,
    pub outcome: DocumentOutcome,
    /// Whether the document was split into chapters.
    pub split: bool,
    /// Chapter start pages the split plan was built from.
    pub chapter_starts: Vec<u32>,
    pub ranges: Vec<RangeReport>,
    /// Inputs deleted during cleanup.
    pub removed: Vec<PathBuf>,
    pub duration_ms: u64,
}

impl DocumentReport {
    /// A report for a document that has not been processed yet.
    pub fn new(source: PathBuf) -> Self {
        Self {
            source,
            state: DocumentState::Discovered,
            outcome: DocumentOutcome::Done,
            split: false,
            chapter_starts: Vec::new(),
            ranges: Vec::new(),
            removed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn archives_written(&self) -> usize {
        self.ranges.iter().filter(|r| r.is_written()).count()
    }

    pub fn ranges_failed(&self) -> usize {
        self.ranges.iter().filter(|r| r.is_failed()).count()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Failed { .. })
    }
}

// ── Prefix post-pass ─────────────────────────────────────────────────────

/// Outcome of renaming one archive in the prefix post-pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RenameOutcome {
    Renamed,
    /// The target name exists and overwriting is off.
    SkippedExisting,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameReport {
    pub from: PathBuf,
    pub to: PathBuf,
    pub outcome: RenameOutcome,
}

// ── Preparation ──────────────────────────────────────────────────────────

/// A per-file problem met during preparation. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepareIssue {
    pub path: PathBuf,
    pub error: String,
}

/// What the preparation stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrepareSummary {
    pub epubs_converted: usize,
    pub epubs_removed: usize,
    pub chapter_sidecars_written: usize,
    pub metadata_sidecars_written: usize,
    pub opf_removed: usize,
    pub issues: Vec<PrepareIssue>,
}

// ── Whole run ────────────────────────────────────────────────────────────

/// Aggregate counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub documents: usize,
    pub documents_done: usize,
    pub documents_skipped: usize,
    pub documents_failed: usize,
    pub archives_written: usize,
    pub archives_skipped: usize,
    pub ranges_empty: usize,
    pub ranges_failed: usize,
    pub archives_renamed: usize,
    pub total_duration_ms: u64,
}

/// Result of [`crate::run`] or [`crate::convert::package_directory`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// `None` when the preparation stage did not run.
    pub prepare: Option<PrepareSummary>,
    pub documents: Vec<DocumentReport>,
    pub renames: Vec<RenameReport>,
    pub stats: RunStats,
}

impl RunSummary {
    /// Recompute [`RunStats`] from the reports, keeping `total_duration_ms`.
    pub fn recount(&mut self) {
        let mut s = RunStats {
            documents: self.documents.len(),
            total_duration_ms: self.stats.total_duration_ms,
            ..Default::default()
        };
        for doc in &self.documents {
            match doc.outcome {
                DocumentOutcome::Done => s.documents_done += 1,
                DocumentOutcome::Skipped { .. } => s.documents_skipped += 1,
                DocumentOutcome::Failed { .. } => s.documents_failed += 1,
            }
            for r in &doc.ranges {
                match r.outcome {
                    RangeOutcome::Written { .. } => s.archives_written += 1,
                    RangeOutcome::SkippedExisting => s.archives_skipped += 1,
                    RangeOutcome::Empty => s.ranges_empty += 1,
                    RangeOutcome::Failed { .. } => s.ranges_failed += 1,
                }
            }
        }
        s.archives_renamed = self
            .renames
            .iter()
            .filter(|r| r.outcome == RenameOutcome::Renamed)
            .count();
        self.stats = s;
    }

    /// Whether any document failed or any range failed.
    pub fn has_failures(&self) -> bool {
        self.documents
            .iter()
            .any(|d| d.is_failed() || d.ranges_failed() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(chapter: usize, outcome: RangeOutcome) -> RangeReport {
        RangeReport {
            chapter,
            range: PageRange::open(1),
            archive: PathBuf::from(format!("B Chapter {chapter}.cbz")),
            outcome,
        }
    }

    #[test]
    fn recount_aggregates_outcomes() {
        let mut doc = DocumentReport::new(PathBuf::from("B.pdf"));
        doc.ranges = vec![
            range(1, RangeOutcome::Written { images: 3, bytes: 100 }),
            range(2, RangeOutcome::SkippedExisting),
            range(
                3,
                RangeOutcome::Failed {
                    error: RangeError::RenderFailed {
                        chapter: 3,
                        detail: "x".into(),
                    },
                },
            ),
            range(4, RangeOutcome::Empty),
        ];
        let mut failed = DocumentReport::new(PathBuf::from("C.pdf"));
        failed.outcome = DocumentOutcome::Failed {
            state: DocumentState::InfoLoaded,
            reason: "boom".into(),
        };

        let mut summary = RunSummary {
            documents: vec![doc, failed],
            renames: vec![RenameReport {
                from: "V B Chapter 1.cbz".into(),
                to: "B Chapter 1.cbz".into(),
                outcome: RenameOutcome::Renamed,
            }],
            ..Default::default()
        };
        summary.recount();

        let s = &summary.stats;
        assert_eq!((s.documents, s.documents_done, s.documents_failed), (2, 1, 1));
        assert_eq!((s.archives_written, s.archives_skipped), (1, 1));
        assert_eq!((s.ranges_failed, s.ranges_empty), (1, 1));
        assert_eq!(s.archives_renamed, 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn reports_serialise_with_status_tags() {
        let mut doc = DocumentReport::new(PathBuf::from("B.pdf"));
        doc.ranges.push(range(1, RangeOutcome::Empty));
        doc.outcome = DocumentOutcome::Skipped {
            reason: "source missing".into(),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains(r#""status":"skipped""#), "got {json}");
        assert!(json.contains(r#""status":"empty""#), "got {json}");
        assert!(json.contains(r#""state":"discovered""#), "got {json}");
    }
}
