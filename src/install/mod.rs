//! Install engine: release resolution, download, extraction and linking
//!
//! The orchestrator runs one pipeline per program under a fixed slot budget
//! and reports everything through a single ordered event stream.

mod async_task;
mod download;
mod error;
mod extract;
mod link;
pub mod marker;
mod orchestrator;
mod pipeline;
mod resolver;
mod state;

pub use async_task::AsyncTask;
pub use download::{ArtifactFetcher, HttpFetcher, RetryPolicy, download_with_retry};
pub use error::{ExtractError, FetchError, InstallError, LinkError, ResolveError};
pub use extract::{ArchiveExtractor, ArchiveFormat, FormatExtractor, extract};
pub use link::{LinkPublisher, SymlinkPublisher, is_plain_name, link};
pub use orchestrator::{DEFAULT_CONCURRENCY, InstallRun, Orchestrator, OrchestratorBuilder};
pub use resolver::{GitHubResolver, Release, ReleaseResolver};
pub use state::{BinSelectionRequest, InstallEvent, InstallState, ProgressEvent};
