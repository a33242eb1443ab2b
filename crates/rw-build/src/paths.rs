//! Per-page path planning.
//!
//! Navigation paths are source-relative identifiers with `/` separators
//! (e.g. `en/guide/setup.md`). [`plan`] derives every path a page needs
//! downstream; it touches no filesystem state.

use std::path::PathBuf;

use rw_config::{BuildConfig, OutputFormat};

/// Directory (inside a section's output directory) holding the bundle.
pub const SINGLE_PAGE_DIR: &str = "_single_page";

/// File name of a section's single page bundle.
pub const SINGLE_PAGE_FILE: &str = "index.md";

/// Invalid navigation or include path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid document path '{path}': {reason}")]
pub struct PathError {
    /// Offending path as given.
    pub path: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl PathError {
    fn new(path: &str, reason: &'static str) -> Self {
        Self {
            path: path.to_owned(),
            reason,
        }
    }
}

/// Paths of a page's single page bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePagePaths {
    /// Bundle directory: `output_root/<section>/_single_page`.
    pub dir: PathBuf,
    /// Bundle file inside [`Self::dir`].
    pub bundle_path: PathBuf,
    /// Where the page would live if it were rendered inside the bundle directory.
    pub file_dir: PathBuf,
    /// Page output path relative to the bundle directory (e.g. `../guide/setup.md`).
    pub relative_path: String,
}

/// Derived, immutable path facts for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFacts {
    /// Normalized source-relative path (navigation identifier).
    pub source_path: String,
    /// Absolute source file path.
    pub resolved_source_path: PathBuf,
    /// Directory receiving the page output.
    pub output_dir: PathBuf,
    /// Output file for converted pages.
    pub output_path: PathBuf,
    /// Source file name with extension.
    pub file_name: String,
    /// Source file name without extension.
    pub base_name: String,
    /// Lowercased extension including the dot, empty when there is none.
    pub extension: String,
    /// Owning section: first path component, empty for root-level files.
    pub section_dir: String,
    /// Bundle paths; present when markdown single page output is enabled.
    pub single_page: Option<SinglePagePaths>,
}

impl PathFacts {
    /// Destination for files copied verbatim (keeps the source file name).
    #[must_use]
    pub fn copy_target(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    /// Source-relative directory of the page (`""` at the root).
    #[must_use]
    pub fn source_dir(&self) -> &str {
        parent_dir(&self.source_path)
    }
}

/// Normalize a source-relative path.
///
/// Drops empty and `.` segments. Absolute paths and `..` segments are rejected.
pub fn normalize(path: &str) -> Result<String, PathError> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(PathError::new(path, "absolute paths are not allowed"));
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(PathError::new(path, "parent directory segments are not allowed")),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(PathError::new(path, "path is empty"));
    }
    Ok(segments.join("/"))
}

/// Directory part of a source-relative path (`""` for root-level files).
#[must_use]
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolve `target` against the directory of the source-relative file `from`.
///
/// A leading `/` is treated as relative to that directory. Returns `None`
/// when the result would leave the source root.
#[must_use]
pub fn resolve_relative(from: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = parent_dir(from)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Compute [`PathFacts`] for one navigation path.
///
/// Deterministic: identical inputs always produce identical facts.
pub fn plan(nav_path: &str, config: &BuildConfig) -> Result<PathFacts, PathError> {
    let source_path = normalize(nav_path)?;

    let dir = parent_dir(&source_path);
    let file_name = source_path
        .rsplit_once('/')
        .map_or(source_path.as_str(), |(_, name)| name)
        .to_owned();

    let (base_name, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_owned(), format!(".{}", ext.to_lowercase())),
        _ => (file_name.clone(), String::new()),
    };

    let output_dir = if dir.is_empty() {
        config.output_dir.clone()
    } else {
        config.output_dir.join(dir)
    };
    let output_name = format!("{base_name}.{}", config.output_format.extension());
    let output_path = output_dir.join(&output_name);

    let (section_dir, in_section) = match source_path.split_once('/') {
        Some((section, rest)) => (section.to_owned(), rest),
        None => (String::new(), source_path.as_str()),
    };

    let single_page = (config.single_page && config.output_format == OutputFormat::Md).then(|| {
        let section_root = if section_dir.is_empty() {
            config.output_dir.clone()
        } else {
            config.output_dir.join(&section_dir)
        };
        let sp_dir = section_root.join(SINGLE_PAGE_DIR);
        let in_section_dir = parent_dir(in_section);
        let file_dir = if in_section_dir.is_empty() {
            sp_dir.clone()
        } else {
            sp_dir.join(in_section_dir)
        };
        let relative_name = if in_section_dir.is_empty() {
            output_name.clone()
        } else {
            format!("{in_section_dir}/{output_name}")
        };

        SinglePagePaths {
            bundle_path: sp_dir.join(SINGLE_PAGE_FILE),
            dir: sp_dir,
            file_dir,
            relative_path: format!("../{relative_name}"),
        }
    });

    Ok(PathFacts {
        resolved_source_path: config.source_dir.join(&source_path),
        source_path,
        output_dir,
        output_path,
        file_name,
        base_name,
        extension,
        section_dir,
        single_page,
    })
}
