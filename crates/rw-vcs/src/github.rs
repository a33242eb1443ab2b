//! GitHub REST API client.
//!
//! Uses a blocking `ureq` agent; every call runs on the tokio blocking pool so
//! callers never stall the async scheduler.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use ureq::Agent;

use crate::client::{FileContributors, RepoContributor, VcsClient, VcsError};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Page size for list endpoints (GitHub maximum).
const PER_PAGE: usize = 100;

/// User agent required by the GitHub API.
const USER_AGENT: &str = concat!("rw/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContributorDto {
    login: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitDto {
    commit: CommitDetailDto,
    author: Option<AccountDto>,
}

#[derive(Debug, Deserialize)]
struct CommitDetailDto {
    author: Option<CommitAuthorDto>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthorDto {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    login: String,
}

/// Blocking API access shared by all clones of [`GitHubClient`].
struct GitHubApi {
    agent: Agent,
    repo_url: String,
    token: String,
}

impl GitHubApi {
    /// Fetch every page of a list endpoint.
    fn get_all<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, VcsError> {
        let mut items = Vec::new();
        let per_page = PER_PAGE.to_string();

        for page in 1.. {
            let page_str = page.to_string();
            tracing::debug!(url, page, "GitHub list request");

            let response = self
                .agent
                .get(url)
                .header("Authorization", &format!("Bearer {}", self.token))
                .header("Accept", "application/vnd.github+json")
                .header("User-Agent", USER_AGENT)
                .query_pairs(query.iter().copied())
                .query("per_page", &per_page)
                .query("page", &page_str)
                .call()?;

            let status = response.status().as_u16();
            let mut body_reader = response.into_body();

            if status >= 400 {
                let error_body = body_reader
                    .read_to_string()
                    .unwrap_or_else(|_| "(unable to read error body)".to_owned());
                return Err(VcsError::Http {
                    status,
                    body: error_body,
                });
            }

            let batch: Vec<T> = body_reader.read_json()?;
            let last = batch.len() < PER_PAGE;
            items.extend(batch);
            if last {
                break;
            }
        }

        Ok(items)
    }

    fn contributors(&self) -> Result<Vec<RepoContributor>, VcsError> {
        let url = format!("{}/contributors", self.repo_url);
        let contributors: Vec<ContributorDto> = self.get_all(&url, &[])?;

        Ok(contributors
            .into_iter()
            .map(|dto| RepoContributor {
                login: dto.login,
                avatar: dto.avatar_url.unwrap_or_default(),
            })
            .collect())
    }

    fn commits_by_path(&self, path: &str) -> Result<FileContributors, VcsError> {
        let url = format!("{}/commits", self.repo_url);
        let commits: Vec<CommitDto> = self.get_all(&url, &[("path", path)])?;
        Ok(count_authors(commits))
    }
}

/// Count commits per author login. Commits without a linked account are skipped.
fn count_authors(commits: Vec<CommitDto>) -> FileContributors {
    let mut contributors = FileContributors::new();
    for commit in commits {
        let Some(account) = commit.author else {
            continue;
        };
        let stats = contributors.entry(account.login).or_default();
        stats.commits += 1;
        if stats.name.is_empty()
            && let Some(name) = commit.commit.author.and_then(|a| a.name)
        {
            stats.name = name;
        }
    }
    contributors
}

/// GitHub-backed [`VcsClient`].
#[derive(Clone)]
pub struct GitHubClient {
    api: Arc<GitHubApi>,
}

impl GitHubClient {
    /// Create a client for `owner/repo` at the given API endpoint.
    #[must_use]
    pub fn new(endpoint: &str, token: &str, owner: &str, repo: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            api: Arc::new(GitHubApi {
                agent,
                repo_url: format!("{}/repos/{owner}/{repo}", endpoint.trim_end_matches('/')),
                token: token.to_owned(),
            }),
        }
    }
}

impl VcsClient for GitHubClient {
    async fn contributors_for_path(&self, path: &str) -> Result<FileContributors, VcsError> {
        let api = Arc::clone(&self.api);
        let path = path.to_owned();
        tokio::task::spawn_blocking(move || api.commits_by_path(&path)).await?
    }

    async fn all_contributors(&self) -> Result<Vec<RepoContributor>, VcsError> {
        let api = Arc::clone(&self.api);
        tokio::task::spawn_blocking(move || api.contributors()).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_url_trims_trailing_slash() {
        let client = GitHubClient::new("https://ghe.example.com/api/v3/", "t", "docs", "handbook");
        assert_eq!(
            client.api.repo_url,
            "https://ghe.example.com/api/v3/repos/docs/handbook"
        );
    }

    #[test]
    fn test_count_authors() {
        let json = r#"[
            {"commit": {"author": {"name": "Alice A."}}, "author": {"login": "alice"}},
            {"commit": {"author": {"name": "Alice"}}, "author": {"login": "alice"}},
            {"commit": {"author": {"name": "Bob"}}, "author": {"login": "bob"}},
            {"commit": {"author": {"name": "Ghost"}}, "author": null}
        ]"#;
        let commits: Vec<CommitDto> = serde_json::from_str(json).unwrap();

        let contributors = count_authors(commits);

        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors["alice"].commits, 2);
        assert_eq!(contributors["alice"].name, "Alice A.");
        assert_eq!(contributors["bob"].commits, 1);
    }

    #[test]
    fn test_contributor_dto_without_login() {
        let json = r#"[{"login": "alice", "avatar_url": "https://a/1"}, {"type": "Anonymous"}]"#;
        let dtos: Vec<ContributorDto> = serde_json::from_str(json).unwrap();
        assert_eq!(dtos[0].login.as_deref(), Some("alice"));
        assert!(dtos[1].login.is_none());
        assert!(dtos[1].avatar_url.is_none());
    }
}
