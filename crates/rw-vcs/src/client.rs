//! Version control client trait and shared types.

use std::collections::HashMap;
use std::future::Future;

/// Contribution statistics of one author for one file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContributionStats {
    /// Author display name as recorded in history (may be empty).
    pub name: String,
    /// Number of commits touching the file.
    pub commits: usize,
}

/// Authors of a single file keyed by login.
pub type FileContributors = HashMap<String, ContributionStats>;

/// Repository-wide contributor entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContributor {
    /// Account login. Anonymous contributors have none.
    pub login: Option<String>,
    /// Avatar URL (empty when unknown).
    pub avatar: String,
}

/// Error returned by version control lookups.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed: {0}")]
    Request(#[from] ureq::Error),

    /// Server returned an error status.
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Background lookup task failed.
    #[error("lookup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// History is not available for the requested path.
    #[error("history unavailable: {0}")]
    Unavailable(String),
}

/// Source of contributor history.
///
/// Both lookups are asynchronous and may fail. Paths are repository-relative
/// with `/` separators.
pub trait VcsClient: Send + Sync {
    /// Authors of the file at `path`, keyed by login.
    fn contributors_for_path(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<FileContributors, VcsError>> + Send;

    /// Every contributor of the repository.
    fn all_contributors(
        &self,
    ) -> impl Future<Output = Result<Vec<RepoContributor>, VcsError>> + Send;
}
