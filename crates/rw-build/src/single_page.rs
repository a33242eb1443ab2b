//! Per-section single page bundles.
//!
//! Every page of a section contributes one fragment. Fragments are ordered
//! by the page's navigation sequence number, so the bundle reads in
//! navigation order no matter which page finished first.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::front_matter;

/// Separator placed between two pages of a bundle.
pub const PAGE_DELIMITER: &str = "\n\n<hr class=\"single-page-delimiter\">\n\n";

#[derive(Debug)]
struct Fragment {
    relative_path: String,
    content: String,
}

/// Fragments of one section.
#[derive(Debug, Default)]
struct SectionAccumulator {
    fragments: BTreeMap<usize, Fragment>,
    /// Source path to the sequence number its fragment is stored under.
    visited: HashMap<String, usize>,
}

impl SectionAccumulator {
    fn append(&mut self, seq: usize, source_path: &str, relative_path: &str, content: &str) -> bool {
        if let Some(&existing) = self.visited.get(source_path) {
            if seq < existing
                && let Some(fragment) = self.fragments.remove(&existing)
            {
                self.fragments.insert(seq, fragment);
                self.visited.insert(source_path.to_owned(), seq);
            }
            return false;
        }

        self.visited.insert(source_path.to_owned(), seq);
        self.fragments.insert(
            seq,
            Fragment {
                relative_path: relative_path.to_owned(),
                content: front_matter::strip(content).trim().to_owned(),
            },
        );
        true
    }

    fn render(&self) -> String {
        let mut ids = HashSet::with_capacity(self.fragments.len());
        let mut pages = Vec::with_capacity(self.fragments.len());
        for fragment in self.fragments.values() {
            let id = unique_id(anchor_id(&fragment.relative_path), &mut ids);
            if fragment.content.is_empty() {
                pages.push(format!("<a id=\"{id}\"></a>"));
            } else {
                pages.push(format!("<a id=\"{id}\"></a>\n\n{}", fragment.content));
            }
        }
        let mut bundle = pages.join(PAGE_DELIMITER);
        bundle.push('\n');
        bundle
    }
}

/// Anchor id of a page inside its bundle.
///
/// `../guide/setup.md` becomes `guide_setup`. Different paths may map to
/// the same id; a bundle suffixes repeats with `-2`, `-3`, ...
#[must_use]
pub fn anchor_id(relative_path: &str) -> String {
    let path = relative_path.trim_start_matches("../");
    let stem = match path.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => stem,
        _ => path,
    };
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `id`, or `id-2`, `id-3`, ... when taken. [`anchor_id`] never emits `-`,
/// so suffixed ids cannot clash with plain ones.
fn unique_id(id: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(id.clone()) {
        return id;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{id}-{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Collects fragments per section and writes bundles.
///
/// The outer lock only guards the section map. Work on a section happens
/// under that section's own async lock, so unrelated sections never wait
/// on each other.
#[derive(Debug, Default)]
pub struct SinglePageAggregator {
    sections: Mutex<HashMap<String, Arc<tokio::sync::Mutex<SectionAccumulator>>>>,
}

impl SinglePageAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn section(&self, section_dir: &str) -> Arc<tokio::sync::Mutex<SectionAccumulator>> {
        let mut sections = self.sections.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sections.entry(section_dir.to_owned()).or_default())
    }

    /// Add a page's fragment to its section.
    ///
    /// Returns `true` when the source path was not part of the section yet.
    /// Appending a known source path again never adds a second fragment; a
    /// lower `seq` moves the existing fragment to that position.
    pub async fn append(
        &self,
        section_dir: &str,
        seq: usize,
        source_path: &str,
        relative_path: &str,
        content: &str,
    ) -> bool {
        let section = self.section(section_dir);
        let mut acc = section.lock().await;
        acc.append(seq, source_path, relative_path, content)
    }

    /// Current bundle text of a section, `None` for an unknown section.
    pub async fn flush(&self, section_dir: &str) -> Option<String> {
        let section = {
            let sections = self.sections.lock().unwrap_or_else(PoisonError::into_inner);
            sections.get(section_dir).map(Arc::clone)?
        };
        let acc = section.lock().await;
        Some(acc.render())
    }

    /// Append a fragment and rewrite the section's bundle file.
    ///
    /// The section lock is held until the write completes, so the file on
    /// disk always matches some consistent set of fragments.
    pub async fn append_and_write(
        &self,
        section_dir: &str,
        seq: usize,
        source_path: &str,
        relative_path: &str,
        content: &str,
        bundle_path: &Path,
    ) -> std::io::Result<bool> {
        let section = self.section(section_dir);
        let mut acc = section.lock().await;

        let added = acc.append(seq, source_path, relative_path, content);
        let bundle = acc.render();

        if let Some(dir) = bundle_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(bundle_path, bundle).await?;
        tracing::debug!(
            section = section_dir,
            path = source_path,
            pages = acc.fragments.len(),
            "Updated single page bundle"
        );

        Ok(added)
    }
}
