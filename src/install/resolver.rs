//! GitHub release API interaction

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;

use super::async_task::AsyncTask;
use super::error::ResolveError;

/// Latest published release of a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Tag exactly as published (e.g. "v0.56.0")
    pub tag: String,
    /// Tag with a single leading "v" stripped (e.g. "0.56.0")
    pub version: String,
}

impl Release {
    /// Build from a raw tag; `None` when nothing is left after normalising
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        let version = tag.strip_prefix('v').unwrap_or(tag);
        if version.is_empty() {
            return None;
        }
        Some(Self {
            tag: tag.to_string(),
            version: version.to_string(),
        })
    }
}

/// Looks up the latest release of a repository (`owner/name`)
pub trait ReleaseResolver: Send + Sync {
    fn latest_release(&self, repo: &str) -> AsyncTask<Result<Release, ResolveError>>;
}

/// GitHub release metadata from API
#[derive(Deserialize, Debug)]
struct GitHubRelease {
    tag_name: String,
}

/// `ReleaseResolver` backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubResolver {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubResolver {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ghbin/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

impl ReleaseResolver for GitHubResolver {
    fn latest_release(&self, repo: &str) -> AsyncTask<Result<Release, ResolveError>> {
        let url = format!("{}/repos/{}/releases/latest", self.base_url, repo);
        let client = self.client.clone();
        let token = self.token.clone();
        let repo = repo.to_string();

        AsyncTask::from_future(async move {
            debug!("resolving latest release of {repo} via {url}");
            let mut request = client
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/vnd.github+json");
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await.map_err(|e| ResolveError::Transport {
                repo: repo.clone(),
                message: e.to_string(),
            })?;

            match response.status() {
                StatusCode::OK => {}
                StatusCode::NOT_FOUND => return Err(ResolveError::NotFound { repo }),
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                    return Err(ResolveError::RateLimited { repo });
                }
                status => {
                    return Err(ResolveError::Transport {
                        message: format!("unexpected GitHub API status {}", status.as_u16()),
                        repo,
                    });
                }
            }

            let release: GitHubRelease =
                response.json().await.map_err(|e| ResolveError::Malformed {
                    repo: repo.clone(),
                    message: e.to_string(),
                })?;

            Release::from_tag(&release.tag_name).ok_or_else(|| ResolveError::Malformed {
                repo,
                message: "empty tag_name".to_string(),
            })
        })
    }
}
