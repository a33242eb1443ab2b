//! Mock version control client for testing.
//!
//! Provides [`MockVcs`] for unit testing without network access.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use crate::client::{
    ContributionStats, FileContributors, RepoContributor, VcsClient, VcsError,
};

/// Mock version control client.
///
/// Stores per-path history and the repository contributor list in memory.
/// Use the builder methods to configure the mock with test data.
///
/// # Example
///
/// ```ignore
/// use rw_vcs::MockVcs;
///
/// let vcs = MockVcs::new()
///     .with_contributor("alice", "https://avatars/alice")
///     .with_history("docs/intro.md", &[("alice", 3)]);
/// ```
#[derive(Debug, Default)]
pub struct MockVcs {
    histories: RwLock<HashMap<String, FileContributors>>,
    contributors: RwLock<Vec<RepoContributor>>,
    failing_paths: RwLock<HashSet<String>>,
    global_failure: RwLock<bool>,
    lookups: Mutex<Vec<String>>,
}

impl MockVcs {
    /// Create a new empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a repository contributor.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_contributor(self, login: impl Into<String>, avatar: impl Into<String>) -> Self {
        self.contributors.write().unwrap().push(RepoContributor {
            login: Some(login.into()),
            avatar: avatar.into(),
        });
        self
    }

    /// Add an anonymous repository contributor (no login).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_anonymous_contributor(self) -> Self {
        self.contributors.write().unwrap().push(RepoContributor {
            login: None,
            avatar: String::new(),
        });
        self
    }

    /// Set history for a path as `(login, commits)` pairs.
    ///
    /// Display names default to the login.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_history(self, path: impl Into<String>, authors: &[(&str, usize)]) -> Self {
        let history = authors
            .iter()
            .map(|&(login, commits)| {
                (
                    login.to_owned(),
                    ContributionStats {
                        name: login.to_owned(),
                        commits,
                    },
                )
            })
            .collect();
        self.histories.write().unwrap().insert(path.into(), history);
        self
    }

    /// Make lookups for `path` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failure(self, path: impl Into<String>) -> Self {
        self.failing_paths.write().unwrap().insert(path.into());
        self
    }

    /// Make the repository contributor list lookup fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_global_failure(self) -> Self {
        *self.global_failure.write().unwrap() = true;
        self
    }

    /// Paths looked up so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl VcsClient for MockVcs {
    async fn contributors_for_path(&self, path: &str) -> Result<FileContributors, VcsError> {
        self.lookups.lock().unwrap().push(path.to_owned());

        if self.failing_paths.read().unwrap().contains(path) {
            return Err(VcsError::Unavailable(path.to_owned()));
        }

        Ok(self
            .histories
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn all_contributors(&self) -> Result<Vec<RepoContributor>, VcsError> {
        if *self.global_failure.read().unwrap() {
            return Err(VcsError::Unavailable("repository contributors".to_owned()));
        }
        Ok(self.contributors.read().unwrap().clone())
    }
}
