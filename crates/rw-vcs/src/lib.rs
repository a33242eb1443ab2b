//! Version control contributor history for RW documentation engine.
//!
//! This crate provides the [`VcsClient`] trait used by the build to attribute
//! pages to the people who wrote them:
//!
//! - `contributors_for_path()`: authors of one repository file
//! - `all_contributors()`: every contributor of the repository
//!
//! # Implementations
//!
//! - [`GitHubClient`]: GitHub REST API (commits and contributors endpoints)
//! - [`MockVcs`]: in-memory history for testing (behind `mock` feature flag)

mod client;
mod github;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use client::{ContributionStats, FileContributors, RepoContributor, VcsClient, VcsError};
pub use github::GitHubClient;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockVcs;
