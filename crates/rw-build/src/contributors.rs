//! Contributor attribution.
//!
//! A page is attributed to the authors of its own file and of every file it
//! pulls in through include directives, transitively. Only logins known to
//! the repository-wide [`ContributorDirectory`] are kept.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use rw_vcs::{FileContributors, RepoContributor, VcsClient, VcsError};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::front_matter;
use crate::includes::include_targets;
use crate::paths::resolve_relative;

/// Metadata field carrying the serialized contributor list.
pub const CONTRIBUTORS_FIELD: &str = "contributors";

/// A person credited on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    /// Account login (identity).
    pub login: String,
    /// Avatar URL.
    pub avatar: String,
    /// Display name.
    pub name: String,
    /// Commits to the page and its included files.
    pub commits: usize,
}

/// Contributors of one page keyed by login.
pub type PageContributors = BTreeMap<String, Contributor>;

/// Repository-wide contributor directory.
///
/// Built once per build and read-only afterwards.
#[derive(Debug, Default)]
pub struct ContributorDirectory {
    entries: HashMap<String, Contributor>,
}

impl ContributorDirectory {
    /// Build from the repository contributor list, dropping entries without login.
    #[must_use]
    pub fn from_repo(contributors: Vec<RepoContributor>) -> Self {
        let entries = contributors
            .into_iter()
            .filter_map(|c| {
                let login = c.login.filter(|l| !l.is_empty())?;
                Some((
                    login.clone(),
                    Contributor {
                        login,
                        avatar: c.avatar,
                        name: String::new(),
                        commits: 0,
                    },
                ))
            })
            .collect();
        Self { entries }
    }

    /// Fetch the repository contributor list and build the directory.
    pub async fn load<V: VcsClient>(vcs: &V) -> Result<Self, VcsError> {
        let contributors = vcs.all_contributors().await?;
        Ok(Self::from_repo(contributors))
    }

    /// Directory entry for `login`.
    #[must_use]
    pub fn get(&self, login: &str) -> Option<&Contributor> {
        self.entries.get(login)
    }

    /// Number of known contributors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no contributors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Error during contributor attribution of a page.
#[derive(Debug, thiserror::Error)]
pub enum AttributionError {
    /// History lookup failed for one file.
    #[error("history lookup failed for {path}: {source}")]
    Lookup {
        /// Repository-relative path of the file.
        path: String,
        /// Underlying lookup error.
        source: VcsError,
    },

    /// An included file could not be read.
    #[error("cannot read included file {path}: {source}")]
    ReadInclude {
        /// Source-relative path of the included file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An include target leaves the source directory.
    #[error("include '{target}' in {from} points outside the source directory")]
    IncludeOutsideRoot {
        /// Source-relative path of the including file.
        from: String,
        /// Include target as written.
        target: String,
    },

    /// A lookup task panicked or was cancelled.
    #[error("lookup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Contributor list could not be serialized.
    #[error("cannot serialize contributors: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Resolves page contributors through the include graph.
pub struct ContributorAttributor<V> {
    vcs: Arc<V>,
    source_root: PathBuf,
    path_prefix: String,
}

impl<V: VcsClient + 'static> ContributorAttributor<V> {
    /// Create an attributor reading includes below `source_root`.
    ///
    /// `path_prefix` is the repository-relative directory of `source_root`.
    pub fn new(vcs: Arc<V>, source_root: PathBuf, path_prefix: &str) -> Self {
        Self {
            vcs,
            source_root,
            path_prefix: path_prefix.trim_matches('/').to_owned(),
        }
    }

    /// Repository-relative path of a source-relative path.
    #[must_use]
    pub fn repo_path(&self, source_path: &str) -> String {
        if self.path_prefix.is_empty() {
            source_path.to_owned()
        } else {
            format!("{}/{source_path}", self.path_prefix)
        }
    }

    /// Compute the contributors of a page.
    ///
    /// `page_source_path` is source-relative; `rendered_text` is the page's
    /// rendered content, scanned for include directives.
    pub async fn attribute(
        &self,
        page_source_path: &str,
        rendered_text: &str,
        directory: &ContributorDirectory,
    ) -> Result<PageContributors, AttributionError> {
        let included = self.included_files(page_source_path, rendered_text).await?;
        tracing::debug!(
            path = page_source_path,
            included = included.len(),
            "Resolved include graph"
        );

        let files: Vec<String> = std::iter::once(page_source_path.to_owned())
            .chain(included)
            .collect();
        let histories = self.lookup_all(&files).await?;

        Ok(project(&merge(histories), directory))
    }

    /// Transitive closure of included files, depth-first, page excluded.
    async fn included_files(
        &self,
        page_source_path: &str,
        rendered_text: &str,
    ) -> Result<Vec<String>, AttributionError> {
        let mut visited = HashSet::from([page_source_path.to_owned()]);
        let mut included = Vec::new();
        let mut stack = self.resolve_targets(page_source_path, rendered_text)?;

        while let Some(path) = stack.pop() {
            if !visited.insert(path.clone()) {
                continue;
            }

            let content = tokio::fs::read_to_string(self.source_root.join(&path))
                .await
                .map_err(|source| AttributionError::ReadInclude {
                    path: path.clone(),
                    source,
                })?;
            stack.extend(self.resolve_targets(&path, &content)?);
            included.push(path);
        }

        Ok(included)
    }

    /// Include targets of `text`, resolved and reversed for stack order.
    fn resolve_targets(&self, from: &str, text: &str) -> Result<Vec<String>, AttributionError> {
        include_targets(text)
            .into_iter()
            .rev()
            .map(|target| {
                resolve_relative(from, target).ok_or_else(|| AttributionError::IncludeOutsideRoot {
                    from: from.to_owned(),
                    target: target.to_owned(),
                })
            })
            .collect()
    }

    /// One concurrent history lookup per file; results keep the input order.
    async fn lookup_all(&self, files: &[String]) -> Result<Vec<FileContributors>, AttributionError> {
        let mut lookups = JoinSet::new();
        for (index, file) in files.iter().enumerate() {
            let vcs = Arc::clone(&self.vcs);
            let repo_path = self.repo_path(file);
            lookups.spawn(async move {
                let result = vcs.contributors_for_path(&repo_path).await;
                (index, repo_path, result)
            });
        }

        let mut histories = vec![FileContributors::new(); files.len()];
        while let Some(joined) = lookups.join_next().await {
            let (index, path, result) = joined?;
            histories[index] = result.map_err(|source| AttributionError::Lookup { path, source })?;
        }
        Ok(histories)
    }
}

/// Union of per-file histories: commits are summed, the first non-empty name wins.
fn merge(histories: Vec<FileContributors>) -> FileContributors {
    let mut merged = FileContributors::new();
    for history in histories {
        for (login, stats) in history {
            let entry = merged.entry(login).or_default();
            entry.commits += stats.commits;
            if entry.name.is_empty() {
                entry.name = stats.name;
            }
        }
    }
    merged
}

/// Keep only directory logins, combining history stats with directory metadata.
fn project(merged: &FileContributors, directory: &ContributorDirectory) -> PageContributors {
    merged
        .iter()
        .filter_map(|(login, stats)| {
            let known = directory.get(login)?;
            let name = if known.name.is_empty() {
                stats.name.clone()
            } else {
                known.name.clone()
            };
            Some((
                login.clone(),
                Contributor {
                    login: login.clone(),
                    avatar: known.avatar.clone(),
                    name,
                    commits: stats.commits,
                },
            ))
        })
        .collect()
}

/// Embed the contributor list into the page's metadata block.
pub fn embed_contributors(
    text: &str,
    contributors: &PageContributors,
) -> Result<String, AttributionError> {
    let list: Vec<&Contributor> = contributors.values().collect();
    let value = serde_json::to_string(&list)?;
    Ok(front_matter::embed_field(text, CONTRIBUTORS_FIELD, &value))
}
