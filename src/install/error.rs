//! Error taxonomy for a single program's install pipeline
//!
//! Every failure stays local to the program that hit it: the pipeline ends
//! in `error` and the value below travels to the front end inside a
//! progress event.

use std::path::PathBuf;

use thiserror::Error;

/// Release lookup failures
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("repo {repo:?} not found on GitHub")]
    NotFound { repo: String },

    #[error("GitHub API rate limited for {repo:?}")]
    RateLimited { repo: String },

    #[error("GitHub request for {repo:?} failed: {message}")]
    Transport { repo: String, message: String },

    #[error("malformed GitHub response for {repo:?}: {message}")]
    Malformed { repo: String, message: String },
}

/// Failure of a single download attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("empty response body for {url}")]
    Empty { url: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no data received for {secs} seconds")]
    Stalled { secs: u64 },

    #[error("write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Archive unpacking failures
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported artifact {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("corrupt archive {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Symlink publication failures
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("{} already exists and is not a symlink; remove it manually before installing", path.display())]
    Occupied { path: PathBuf },

    #[error("invalid link name {name:?}: must be a single file name")]
    InvalidName { name: String },

    #[error("create symlink {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failure of one program's pipeline
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("download: {0}")]
    Download(FetchError),

    #[error("cancelled")]
    Cancelled,

    #[error("extract: {0}")]
    Extract(#[from] ExtractError),

    #[error("link {name}: {source}")]
    Link {
        name: String,
        #[source]
        source: LinkError,
    },

    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("write version marker {}: {source}", path.display())]
    Marker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl InstallError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallError::Cancelled)
    }

    /// Remedy to show next to the status line, when one applies
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            InstallError::Resolve(ResolveError::RateLimited { .. }) => {
                Some("set the GITHUB_TOKEN env var to raise the API limit")
            }
            InstallError::Resolve(ResolveError::NotFound { .. }) => {
                Some("check the repo field in the catalog")
            }
            _ => None,
        }
    }
}
