//! Build summary.

use std::collections::BTreeSet;
use std::path::PathBuf;

/// How a page reached the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Rendered from markdown.
    Rendered,
    /// Copied byte for byte.
    Copied,
}

/// Successful result of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Normalized source-relative path.
    pub source_path: String,
    /// File written to the output tree.
    pub output_path: PathBuf,
    pub kind: OutputKind,
    /// Bundle the page contributed to.
    pub bundle: Option<PathBuf>,
    /// Number of contributors embedded into the page.
    pub contributors: Option<usize>,
}

/// Page that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPage {
    /// Navigation path as given.
    pub source_path: String,
    pub reason: String,
}

/// Result of a build, listed in navigation order.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Navigation entries processed.
    pub attempted: usize,
    pub written: Vec<PageOutcome>,
    pub skipped: Vec<SkippedPage>,
    /// Bundle files written.
    pub bundles: BTreeSet<PathBuf>,
}

impl BuildReport {
    pub(crate) fn record_written(&mut self, outcome: PageOutcome) {
        if let Some(bundle) = &outcome.bundle {
            self.bundles.insert(bundle.clone());
        }
        self.written.push(outcome);
    }

    pub(crate) fn record_skipped(&mut self, source_path: &str, reason: String) {
        self.skipped.push(SkippedPage {
            source_path: source_path.to_owned(),
            reason,
        });
    }

    /// Whether every page was written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty()
    }
}
