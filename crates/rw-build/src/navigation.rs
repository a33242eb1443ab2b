//! Navigation loading from `toc.yaml`.
//!
//! A toc file lists pages as nested `items` with `href` fields. An item may
//! pull in another toc file with `include: { path: ... }`; hrefs of the
//! included file are relative to its own directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::paths::resolve_relative;

/// Error while loading navigation.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    /// Toc file could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// Toc file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Toc file is not valid YAML of the expected shape.
    #[error("invalid toc file {}: {source}", .path.display())]
    Parse {
        /// Toc file path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },

    /// A toc file includes itself, directly or through other toc files.
    #[error("toc include cycle at {0}")]
    IncludeCycle(String),

    /// An href or include path leaves the source directory.
    #[error("'{target}' in {toc} points outside the source directory")]
    OutsideRoot {
        /// Source-relative toc file path.
        toc: String,
        /// Offending href or include path.
        target: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TocFile {
    href: Option<String>,
    items: Vec<TocItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TocItem {
    href: Option<String>,
    items: Vec<TocItem>,
    include: Option<TocInclude>,
}

#[derive(Debug, Deserialize)]
struct TocInclude {
    path: String,
}

/// Ordered list of source-relative document paths.
///
/// Order is the depth-first document order of the toc; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigation {
    paths: Vec<String>,
}

impl Navigation {
    /// Navigation from an explicit path list.
    #[must_use]
    pub fn from_paths(paths: Vec<String>) -> Self {
        Self { paths }
    }

    /// Load the toc file `toc_name` from `source_root`, following includes.
    pub fn load(source_root: &Path, toc_name: &str) -> Result<Self, NavigationError> {
        let mut loader = Loader {
            source_root,
            active: HashSet::new(),
            paths: Vec::new(),
        };
        loader.load_toc(toc_name)?;
        tracing::debug!(toc = toc_name, pages = loader.paths.len(), "Loaded navigation");
        Ok(Self {
            paths: loader.paths,
        })
    }

    /// Document paths in navigation order.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Number of navigation entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether navigation lists no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

struct Loader<'a> {
    source_root: &'a Path,
    /// Toc files on the current include chain.
    active: HashSet<String>,
    paths: Vec<String>,
}

impl Loader<'_> {
    fn load_toc(&mut self, toc_path: &str) -> Result<(), NavigationError> {
        if !self.active.insert(toc_path.to_owned()) {
            return Err(NavigationError::IncludeCycle(toc_path.to_owned()));
        }

        let path = self.source_root.join(toc_path);
        let content = std::fs::read_to_string(&path).map_err(|source| NavigationError::Io {
            path: path.clone(),
            source,
        })?;
        let toc: TocFile = serde_yaml::from_str(&content)
            .map_err(|source| NavigationError::Parse { path, source })?;

        if let Some(href) = &toc.href {
            self.push_href(toc_path, href)?;
        }
        self.walk(toc_path, &toc.items)?;

        self.active.remove(toc_path);
        Ok(())
    }

    fn walk(&mut self, toc_path: &str, items: &[TocItem]) -> Result<(), NavigationError> {
        for item in items {
            if let Some(href) = &item.href {
                self.push_href(toc_path, href)?;
            }
            if let Some(include) = &item.include {
                let nested = resolve(toc_path, &include.path)?;
                self.load_toc(&nested)?;
            }
            self.walk(toc_path, &item.items)?;
        }
        Ok(())
    }

    fn push_href(&mut self, toc_path: &str, href: &str) -> Result<(), NavigationError> {
        if is_external(href) {
            return Ok(());
        }
        let path = resolve(toc_path, href)?;
        self.paths.push(path);
        Ok(())
    }
}

fn resolve(toc_path: &str, target: &str) -> Result<String, NavigationError> {
    resolve_relative(toc_path, target).ok_or_else(|| NavigationError::OutsideRoot {
        toc: toc_path.to_owned(),
        target: target.to_owned(),
    })
}

fn is_external(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://") || href.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(root: &Path, path: &str, content: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    #[test]
    fn test_load_nested_items_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "toc.yaml",
            "\
title: Docs
href: index.yaml
items:
  - name: Intro
    href: en/intro.md
  - name: Guide
    items:
      - name: Setup
        href: en/guide/setup.md
      - name: External
        href: https://example.com/page
  - name: Intro again
    href: ./en/intro.md
",
        );

        let nav = Navigation::load(dir.path(), "toc.yaml").unwrap();
        assert_eq!(
            nav.paths(),
            &[
                "index.yaml",
                "en/intro.md",
                "en/guide/setup.md",
                "en/intro.md"
            ]
        );
    }

    #[test]
    fn test_include_is_relative_to_nested_toc() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "toc.yaml",
            "items:\n  - href: index.md\n  - name: Guide\n    include:\n      path: guide/toc.yaml\n  - href: last.md\n",
        );
        write(
            dir.path(),
            "guide/toc.yaml",
            "items:\n  - href: setup.md\n  - href: //cdn.example.com/x\n  - href: ../shared/note.md\n",
        );

        let nav = Navigation::load(dir.path(), "toc.yaml").unwrap();
        assert_eq!(
            nav.paths(),
            &["index.md", "guide/setup.md", "shared/note.md", "last.md"]
        );
    }

    #[test]
    fn test_include_cycle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "toc.yaml",
            "items:\n  - include:\n      path: a/toc.yaml\n",
        );
        write(
            dir.path(),
            "a/toc.yaml",
            "items:\n  - include:\n      path: ../toc.yaml\n",
        );

        let err = Navigation::load(dir.path(), "toc.yaml").unwrap_err();
        assert!(matches!(err, NavigationError::IncludeCycle(ref p) if p == "toc.yaml"));
    }

    #[test]
    fn test_same_toc_included_twice_is_not_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "toc.yaml",
            "items:\n  - include: {path: shared/toc.yaml}\n  - include: {path: shared/toc.yaml}\n",
        );
        write(dir.path(), "shared/toc.yaml", "items:\n  - href: a.md\n");

        let nav = Navigation::load(dir.path(), "toc.yaml").unwrap();
        assert_eq!(nav.paths(), &["shared/a.md", "shared/a.md"]);
    }

    #[test]
    fn test_href_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "toc.yaml", "items:\n  - href: ../secret.md\n");

        let err = Navigation::load(dir.path(), "toc.yaml").unwrap_err();
        assert!(matches!(err, NavigationError::OutsideRoot { .. }));
    }

    #[test]
    fn test_missing_and_invalid_toc() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Navigation::load(dir.path(), "toc.yaml").unwrap_err(),
            NavigationError::Io { .. }
        ));

        write(dir.path(), "toc.yaml", "items: 42\n");
        assert!(matches!(
            Navigation::load(dir.path(), "toc.yaml").unwrap_err(),
            NavigationError::Parse { .. }
        ));
    }

    #[test]
    fn test_from_paths() {
        let nav = Navigation::from_paths(vec!["a.md".to_owned()]);
        assert_eq!(nav.len(), 1);
        assert!(!nav.is_empty());
    }
}
