//! Public GitHub repositories for the projects page.
//!
//! Repositories are fetched from the REST API without a token and cached
//! for ten minutes, which keeps the page well inside the anonymous rate
//! limit.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Public GitHub REST API root.
const API_ROOT: &str = "https://api.github.com";

/// Repositories shown on the projects page.
pub const SHOWN_REPOSITORIES: usize = 12;

/// Topics shown per repository card.
const SHOWN_TOPICS: usize = 3;

/// Upper bound for one listing request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the repository listing.
#[derive(Debug, Clone, Error)]
pub enum ProjectsError {
    #[error("GitHub request failed: {0}")]
    Network(String),
    #[error("GitHub returned status {0}")]
    Status(u16),
    #[error("Unexpected GitHub response: {0}")]
    Decode(String),
    #[error("Invalid GitHub endpoint: {0}")]
    Endpoint(String),
}

/// One repository as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub homepage: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub fork: bool,
}

impl Repository {
    /// Homepage link, if one is set.
    #[must_use]
    pub fn homepage(&self) -> Option<&str> {
        self.homepage
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// The first few topics.
    #[must_use]
    pub fn shown_topics(&self) -> &[String] {
        self.topics.get(..SHOWN_TOPICS).unwrap_or(self.topics.as_slice())
    }
}

/// The most recently updated repositories, newest first.
#[must_use]
pub fn latest_repositories(mut repos: Vec<Repository>, limit: usize) -> Vec<Repository> {
    repos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.name.cmp(&b.name)));
    repos.truncate(limit);
    repos
}

/// Cached client for one GitHub account's repositories.
#[derive(Clone)]
pub struct ProjectFeed {
    client: reqwest::Client,
    api_root: Url,
    user: Option<String>,
    cache: Cache<String, Arc<Vec<Repository>>>,
}

impl ProjectFeed {
    /// Create a feed for `user` against the public API. No user means an
    /// empty feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(user: Option<String>) -> Result<Self, ProjectsError> {
        Self::with_endpoint(user, API_ROOT)
    }

    /// Create a feed that talks to a different API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the root is not
    /// a URL.
    pub fn with_endpoint(user: Option<String>, api_root: &str) -> Result<Self, ProjectsError> {
        let api_root = Url::parse(api_root).map_err(|e| ProjectsError::Endpoint(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProjectsError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_root,
            user: user.filter(|u| !u.is_empty()),
            cache: Cache::builder()
                .max_capacity(4)
                .time_to_live(Duration::from_secs(600))
                .build(),
        })
    }

    /// The account this feed lists.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The latest repositories for the configured account.
    ///
    /// Failures are not cached, so the next page load retries.
    ///
    /// # Errors
    ///
    /// Returns an error if GitHub is unreachable or answers with something
    /// other than a repository list.
    pub async fn latest(&self) -> Result<Arc<Vec<Repository>>, ProjectsError> {
        let Some(user) = self.user.clone() else {
            return Ok(Arc::new(Vec::new()));
        };

        self.cache
            .try_get_with(user.clone(), async move {
                self.fetch(&user).await.map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch(&self, user: &str) -> Result<Vec<Repository>, ProjectsError> {
        let mut url = self
            .api_root
            .join(&format!("users/{user}/repos"))
            .map_err(|e| ProjectsError::Endpoint(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("sort", "updated")
            .append_pair("per_page", "100");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "GitHub request failed");
                ProjectsError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "GitHub rejected repository listing");
            return Err(ProjectsError::Status(status.as_u16()));
        }

        let repos: Vec<Repository> = response
            .json()
            .await
            .map_err(|e| ProjectsError::Decode(e.to_string()))?;

        tracing::debug!(count = repos.len(), "Fetched GitHub repositories");
        Ok(latest_repositories(repos, SHOWN_REPOSITORIES))
    }
}

impl std::fmt::Debug for ProjectFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectFeed")
            .field("user", &self.user)
            .field("api_root", &self.api_root.as_str())
            .finish_non_exhaustive()
    }
}
