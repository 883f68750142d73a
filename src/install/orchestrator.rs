//! Concurrent install runs
//!
//! One task per program, admitted through a fixed pool of slots. All tasks
//! feed a single event channel; the channel closes once every task has
//! reached a terminal state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::download::{ArtifactFetcher, HttpFetcher, RetryPolicy};
use super::error::InstallError;
use super::extract::{ArchiveExtractor, FormatExtractor};
use super::link::{LinkPublisher, SymlinkPublisher};
use super::pipeline::{self, PipelineContext};
use super::resolver::{GitHubResolver, ReleaseResolver};
use super::state::{EventSink, InstallEvent, InstallState, ProgressEvent};
use crate::catalog::Program;
use crate::config::{InstallPaths, InstallerConfig};

/// Default number of programs allowed mid-pipeline at once
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Runs install pipelines for a set of programs
pub struct Orchestrator {
    ctx: Arc<PipelineContext>,
    concurrency: usize,
}

impl Orchestrator {
    /// Start building an orchestrator around the two network collaborators
    pub fn builder(
        paths: InstallPaths,
        resolver: Arc<dyn ReleaseResolver>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            paths,
            resolver,
            fetcher,
            extractor: Arc::new(FormatExtractor),
            linker: Arc::new(SymlinkPublisher),
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            download_base_url: "https://github.com".to_string(),
            temp_root: std::env::temp_dir(),
        }
    }

    /// Production orchestrator talking to GitHub
    pub fn from_config(config: &InstallerConfig) -> Result<Self> {
        let resolver = GitHubResolver::new(
            &config.api_base_url,
            config.github_token.clone(),
            config.request_timeout(),
        )
        .context("Failed to build GitHub API client")?;
        let fetcher = HttpFetcher::new(config.connect_timeout(), config.inactivity_timeout())
            .context("Failed to build download client")?;

        Ok(Self::builder(config.paths()?, Arc::new(resolver), Arc::new(fetcher))
            .retry(config.retry_policy())
            .concurrency(config.concurrency)
            .download_base_url(&config.download_base_url)
            .temp_root(config.temp_root())
            .build())
    }

    pub fn paths(&self) -> &InstallPaths {
        &self.ctx.paths
    }

    /// Start installing `programs` and return the handle to observe the run.
    ///
    /// Must be called within a Tokio runtime.
    pub fn run(&self, programs: Vec<Program>) -> InstallRun {
        self.run_with_cancel(programs, CancellationToken::new())
    }

    /// Same as [`run`](Self::run), cancelled through a caller-owned token
    pub fn run_with_cancel(&self, programs: Vec<Program>, cancel: CancellationToken) -> InstallRun {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        let slots = Arc::new(Semaphore::new(self.concurrency));
        let ctx = Arc::clone(&self.ctx);
        let token = cancel.clone();

        debug!(
            "starting install run: {} programs, {} slots",
            programs.len(),
            self.concurrency
        );

        let driver = tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            let mut names = HashMap::new();

            for program in programs {
                let name = program.name.clone();
                let handle = tasks.spawn(pipeline::install(
                    Arc::clone(&ctx),
                    program,
                    sink.clone(),
                    Arc::clone(&slots),
                    token.clone(),
                ));
                names.insert(handle.id(), name);
            }

            while let Some(joined) = tasks.join_next_with_id().await {
                match joined {
                    Ok((id, state)) => {
                        if let Some(name) = names.remove(&id) {
                            debug!("{name} finished: {state}");
                        }
                    }
                    Err(e) => {
                        let name = names.remove(&e.id()).unwrap_or_default();
                        error!("install task for {name} aborted: {e}");
                        sink.send(InstallEvent::Progress(ProgressEvent {
                            program: name,
                            state: InstallState::Error,
                            version: None,
                            error: Some(Arc::new(InstallError::Internal(e.to_string()))),
                        }));
                    }
                }
            }
            // Dropping the last sink closes the channel
        });

        InstallRun {
            events: rx,
            cancel,
            driver,
        }
    }
}

/// Configures an [`Orchestrator`]
pub struct OrchestratorBuilder {
    paths: InstallPaths,
    resolver: Arc<dyn ReleaseResolver>,
    fetcher: Arc<dyn ArtifactFetcher>,
    extractor: Arc<dyn ArchiveExtractor>,
    linker: Arc<dyn LinkPublisher>,
    retry: RetryPolicy,
    concurrency: usize,
    download_base_url: String,
    temp_root: PathBuf,
}

impl OrchestratorBuilder {
    pub fn extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn linker(mut self, linker: Arc<dyn LinkPublisher>) -> Self {
        self.linker = linker;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Slot count; clamped to at least one
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn download_base_url(mut self, url: &str) -> Self {
        self.download_base_url = url.to_string();
        self
    }

    /// Parent of the task-private download directories
    pub fn temp_root(mut self, dir: PathBuf) -> Self {
        self.temp_root = dir;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            ctx: Arc::new(PipelineContext {
                resolver: self.resolver,
                fetcher: self.fetcher,
                extractor: self.extractor,
                linker: self.linker,
                paths: self.paths,
                retry: self.retry,
                download_base_url: self.download_base_url,
                temp_root: self.temp_root,
            }),
            concurrency: self.concurrency,
        }
    }
}

/// Handle to a running install
pub struct InstallRun {
    events: mpsc::UnboundedReceiver<InstallEvent>,
    cancel: CancellationToken,
    driver: tokio::task::JoinHandle<()>,
}

impl InstallRun {
    /// Next event, or `None` once every program is terminal
    pub async fn next_event(&mut self) -> Option<InstallEvent> {
        self.events.recv().await
    }

    /// Ask every program to stop at its current suspension point
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to finish without an interactive front end.
    ///
    /// Bin-selection requests are declined, so those programs link nothing.
    /// Returns the last event seen for each program.
    pub async fn finish(mut self) -> Vec<ProgressEvent> {
        let mut last: HashMap<String, ProgressEvent> = HashMap::new();
        while let Some(event) = self.next_event().await {
            match event {
                InstallEvent::Progress(ev) => {
                    last.insert(ev.program.clone(), ev);
                }
                InstallEvent::SelectBins(request) => request.decline(),
            }
        }
        if let Err(e) = (&mut self.driver).await {
            error!("install driver failed: {e}");
        }
        let mut events: Vec<_> = last.into_values().collect();
        events.sort_by(|a, b| a.program.cmp(&b.program));
        events
    }
}

impl Drop for InstallRun {
    fn drop(&mut self) {
        // An abandoned run must not keep installing in the background
        if !self.driver.is_finished() {
            self.cancel.cancel();
        }
    }
}
