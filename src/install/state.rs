//! Install lifecycle states, progress events and the bin-selection handshake

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, oneshot};

use super::error::InstallError;
use crate::catalog::BinLink;

/// Lifecycle state of one program's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallState {
    Pending,
    FetchingVersion,
    Downloading,
    Extracting,
    AwaitingBinSelection,
    Linking,
    Done,
    Skipped,
    Error,
}

impl InstallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Skipped | Self::Error)
    }

    /// States in which a program holds an admission slot and is doing work
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != Self::Pending
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::FetchingVersion => "fetching version",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::AwaitingBinSelection => "awaiting bin selection",
            Self::Linking => "linking",
            Self::Done => "done",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable snapshot emitted at every state transition
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub program: String,
    pub state: InstallState,
    pub version: Option<String>,
    pub error: Option<Arc<InstallError>>,
}

/// Request for the operator to pick executables out of an extracted archive
///
/// Carries a single-use reply channel. Dropping the request without
/// responding releases the waiting task with an empty selection.
#[derive(Debug)]
pub struct BinSelectionRequest {
    pub program: String,
    pub extract_dir: PathBuf,
    reply: oneshot::Sender<Vec<BinLink>>,
}

impl BinSelectionRequest {
    pub(crate) fn new(program: String, extract_dir: PathBuf) -> (Self, oneshot::Receiver<Vec<BinLink>>) {
        let (reply, rx) = oneshot::channel();
        (
            Self {
                program,
                extract_dir,
                reply,
            },
            rx,
        )
    }

    /// Hand the chosen links back to the waiting task.
    ///
    /// Returns `false` when the task is already gone (run cancelled).
    pub fn respond(self, links: Vec<BinLink>) -> bool {
        self.reply.send(links).is_ok()
    }

    /// Close the reply channel without an answer
    pub fn decline(self) {
        drop(self.reply);
    }
}

/// Everything the orchestrator sends to the front end
#[derive(Debug)]
pub enum InstallEvent {
    Progress(ProgressEvent),
    SelectBins(BinSelectionRequest),
}

/// Producer half of the shared event channel
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<InstallEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<InstallEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, event: InstallEvent) {
        if self.tx.send(event).is_err() {
            debug!("event receiver dropped, discarding event");
        }
    }
}

/// Per-program mutable record, owned by exactly one pipeline task.
///
/// Never shared: the front end only sees it through `ProgressEvent`s.
#[derive(Debug)]
pub(crate) struct InstallRecord {
    program: String,
    state: InstallState,
    version: Option<String>,
    error: Option<Arc<InstallError>>,
    pub(crate) links: Vec<BinLink>,
    sink: EventSink,
}

impl InstallRecord {
    pub(crate) fn new(program: &str, sink: EventSink) -> Self {
        Self {
            program: program.to_string(),
            state: InstallState::Pending,
            version: None,
            error: None,
            links: Vec::new(),
            sink,
        }
    }

    pub(crate) fn state(&self) -> InstallState {
        self.state
    }

    pub(crate) fn set_version(&mut self, version: &str) {
        self.version = Some(version.to_string());
    }

    pub(crate) fn snapshot(&self) -> ProgressEvent {
        ProgressEvent {
            program: self.program.clone(),
            state: self.state,
            version: self.version.clone(),
            error: self.error.clone(),
        }
    }

    /// Move to `state` and emit the snapshot
    pub(crate) fn transition(&mut self, state: InstallState) {
        self.state = state;
        self.sink.send(InstallEvent::Progress(self.snapshot()));
    }

    /// Terminate the pipeline at `error`
    pub(crate) fn fail(&mut self, err: InstallError) {
        self.error = Some(Arc::new(err));
        self.transition(InstallState::Error);
    }

    pub(crate) fn request_bins(&self, request: BinSelectionRequest) {
        self.sink.send(InstallEvent::SelectBins(request));
    }
}
