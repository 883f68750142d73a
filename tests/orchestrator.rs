//! End-to-end install runs against fake network collaborators
//!
//! Release lookup and download are faked; extraction, linking and the
//! version marker run for real inside a temp directory.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ghbin::catalog::{BinLink, Program};
use ghbin::config::InstallPaths;
use ghbin::install::{
    ArchiveExtractor, ArchiveFormat, ArtifactFetcher, AsyncTask, ExtractError, FetchError,
    FormatExtractor, InstallError, InstallEvent, InstallState, LinkError, LinkPublisher,
    Orchestrator, ProgressEvent, Release, ReleaseResolver, ResolveError, RetryPolicy,
    SymlinkPublisher, marker,
};
use tokio_util::sync::CancellationToken;

const PAYLOAD: &[u8] = b"#!/bin/sh\necho hi\n";

struct FakeResolver {
    tags: HashMap<String, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ReleaseResolver for FakeResolver {
    fn latest_release(&self, repo: &str) -> AsyncTask<Result<Release, ResolveError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tag = self.tags.get(repo).cloned();
        let repo = repo.to_string();
        let delay = self.delay;
        AsyncTask::from_future(async move {
            tokio::time::sleep(delay).await;
            let tag = tag.ok_or_else(|| ResolveError::NotFound { repo: repo.clone() })?;
            Release::from_tag(&tag).ok_or(ResolveError::Malformed {
                repo,
                message: "empty tag".to_string(),
            })
        })
    }
}

#[derive(Default)]
struct FakeFetcher {
    /// Remaining transient failures, shared by all urls
    transient_failures: AtomicUsize,
    /// Urls containing any of these always fail
    broken: Vec<&'static str>,
    delay: Duration,
    hang: bool,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl ArtifactFetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> AsyncTask<Result<u64, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().expect("lock").push(url.to_string());

        if self.broken.iter().any(|b| url.contains(b)) {
            return AsyncTask::ready(Err(FetchError::Status {
                status: 500,
                url: url.to_string(),
            }));
        }
        let transient = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return AsyncTask::ready(Err(FetchError::Transport("connection reset".to_string())));
        }

        let dest = dest.to_path_buf();
        let delay = self.delay;
        let hang = self.hang;
        let active = Arc::clone(&self.active);
        let max_active = Arc::clone(&self.max_active);
        AsyncTask::from_future(async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_active.fetch_max(now, Ordering::SeqCst);
            if hang {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(delay).await;
            tokio::fs::write(&dest, PAYLOAD).await?;
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(PAYLOAD.len() as u64)
        })
    }
}

#[derive(Default)]
struct CountingExtractor {
    calls: AtomicUsize,
    /// Cancelled while extraction runs, before it reports a corrupt archive
    cancel_then_fail: Option<CancellationToken>,
}

impl ArchiveExtractor for CountingExtractor {
    fn extract(&self, artifact: &Path, dest: &Path) -> Result<ArchiveFormat, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(cancel) = &self.cancel_then_fail {
            cancel.cancel();
            return Err(ExtractError::Corrupt {
                path: artifact.to_path_buf(),
                message: "truncated".to_string(),
            });
        }
        FormatExtractor.extract(artifact, dest)
    }
}

#[derive(Default)]
struct CountingLinker {
    calls: AtomicUsize,
}

impl LinkPublisher for CountingLinker {
    fn link(&self, source: &Path, dir: &Path, name: &str) -> Result<PathBuf, LinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SymlinkPublisher.link(source, dir, name)
    }
}

struct Harness {
    _root: tempfile::TempDir,
    paths: InstallPaths,
    temp_root: PathBuf,
    resolver: Arc<FakeResolver>,
    fetcher: Arc<FakeFetcher>,
    extractor: Arc<CountingExtractor>,
    linker: Arc<CountingLinker>,
    retry: RetryPolicy,
}

impl Harness {
    fn new(tags: &[(&str, &str)], fetcher: FakeFetcher) -> Self {
        Self::with_resolver_delay(tags, fetcher, Duration::from_millis(5))
    }

    fn with_resolver_delay(tags: &[(&str, &str)], fetcher: FakeFetcher, delay: Duration) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = InstallPaths::new(root.path().join("share"), root.path().join("bin"));
        let temp_root = root.path().join("tmp");
        fs::create_dir_all(&temp_root).expect("mkdir tmp");
        Self {
            paths,
            temp_root,
            resolver: Arc::new(FakeResolver {
                tags: tags
                    .iter()
                    .map(|(repo, tag)| (repo.to_string(), tag.to_string()))
                    .collect(),
                delay,
                calls: AtomicUsize::new(0),
            }),
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(CountingExtractor::default()),
            linker: Arc::new(CountingLinker::default()),
            retry: RetryPolicy {
                attempts: 3,
                base_delay: Duration::from_millis(1),
            },
            _root: root,
        }
    }

    fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn extractor(mut self, extractor: CountingExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::builder(
            self.paths.clone(),
            self.resolver.clone(),
            self.fetcher.clone(),
        )
        .extractor(self.extractor.clone())
        .linker(self.linker.clone())
        .retry(self.retry)
        .concurrency(3)
        .download_base_url("https://dl.test")
        .temp_root(self.temp_root.clone())
        .build()
    }

    fn temp_entries(&self) -> usize {
        fs::read_dir(&self.temp_root).expect("read tmp").count()
    }
}

/// Raw single-file release: asset `<name>-<version>`, linked as `<name>`
fn program(name: &str) -> Program {
    Program {
        name: name.to_string(),
        repo: format!("o/{name}"),
        asset_pattern: format!("{name}-{{version}}"),
        packages: Vec::new(),
        bin: vec![BinLink::new(format!("{name}-{{version}}"), name)],
    }
}

fn unlinked(name: &str) -> Program {
    Program {
        bin: Vec::new(),
        ..program(name)
    }
}

fn by_name(events: Vec<ProgressEvent>) -> HashMap<String, ProgressEvent> {
    events.into_iter().map(|e| (e.program.clone(), e)).collect()
}

fn error_of(ev: &ProgressEvent) -> &InstallError {
    ev.error.as_deref().expect("error attached")
}

#[tokio::test]
async fn installs_and_links_declared_binary() {
    let h = Harness::new(&[("o/tool", "v1.2.0")], FakeFetcher::default());
    let mut run = h.orchestrator().run(vec![program("tool")]);

    let mut states = Vec::new();
    while let Some(event) = run.next_event().await {
        match event {
            InstallEvent::Progress(ev) => states.push((ev.state, ev.version)),
            InstallEvent::SelectBins(_) => panic!("declared binaries need no picker"),
        }
    }

    let order: Vec<_> = states.iter().map(|(s, _)| *s).collect();
    assert_eq!(
        order,
        vec![
            InstallState::FetchingVersion,
            InstallState::Downloading,
            InstallState::Extracting,
            InstallState::Linking,
            InstallState::Done,
        ]
    );
    assert_eq!(states.last().and_then(|(_, v)| v.as_deref()), Some("1.2.0"));

    assert_eq!(
        h.fetcher.urls.lock().expect("lock").as_slice(),
        ["https://dl.test/o/tool/releases/download/v1.2.0/tool-1.2.0"]
    );
    assert_eq!(marker::read(&h.paths.marker_path("tool")).as_deref(), Some("1.2.0"));
    let link = h.paths.link_path("tool");
    assert_eq!(
        fs::read_link(&link).expect("symlink"),
        h.paths.install_dir("tool").join("tool-1.2.0")
    );
    assert_eq!(fs::read(&link).expect("read through link"), PAYLOAD);
    assert_eq!(h.temp_entries(), 0);
}

#[tokio::test]
async fn second_run_skips_without_download_extract_or_link() {
    let h = Harness::new(&[("o/tool", "v1.2.0")], FakeFetcher::default());
    let orchestrator = h.orchestrator();

    let first = by_name(orchestrator.run(vec![program("tool")]).finish().await);
    assert_eq!(first["tool"].state, InstallState::Done);

    let second = by_name(orchestrator.run(vec![program("tool")]).finish().await);
    assert_eq!(second["tool"].state, InstallState::Skipped);
    assert_eq!(second["tool"].version.as_deref(), Some("1.2.0"));

    assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.linker.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_or_garbled_marker_reinstalls() {
    let h = Harness::new(
        &[("o/old", "v2.0.0"), ("o/junk", "2.0.0")],
        FakeFetcher::default(),
    );
    marker::write(&h.paths.marker_path("old"), "1.9.0").expect("marker");
    fs::create_dir_all(h.paths.install_dir("junk")).expect("mkdir");
    fs::write(h.paths.marker_path("junk"), [0xff, 0x00, 0xfe]).expect("marker");

    let result = by_name(
        h.orchestrator()
            .run(vec![program("old"), program("junk")])
            .finish()
            .await,
    );

    assert_eq!(result["old"].state, InstallState::Done);
    assert_eq!(result["junk"].state, InstallState::Done);
    assert_eq!(marker::read(&h.paths.marker_path("old")).as_deref(), Some("2.0.0"));
    assert_eq!(marker::read(&h.paths.marker_path("junk")).as_deref(), Some("2.0.0"));
}

#[tokio::test]
async fn transient_download_failures_are_retried() {
    let fetcher = FakeFetcher {
        transient_failures: AtomicUsize::new(2),
        ..FakeFetcher::default()
    };
    let h = Harness::new(&[("o/tool", "v1.0.0")], fetcher);

    let result = by_name(h.orchestrator().run(vec![program("tool")]).finish().await);

    assert_eq!(result["tool"].state, InstallState::Done);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failures_stay_with_their_program() {
    let fetcher = FakeFetcher {
        broken: vec!["/o/broken/"],
        ..FakeFetcher::default()
    };
    let h = Harness::new(
        &[("o/good", "v1.0.0"), ("o/broken", "v1.0.0")],
        fetcher,
    );

    let result = by_name(
        h.orchestrator()
            .run(vec![program("good"), program("broken"), program("ghost")])
            .finish()
            .await,
    );

    assert_eq!(result["good"].state, InstallState::Done);

    assert_eq!(result["broken"].state, InstallState::Error);
    assert!(matches!(
        error_of(&result["broken"]),
        InstallError::Download(FetchError::Status { status: 500, .. })
    ));
    assert_eq!(marker::read(&h.paths.marker_path("broken")), None);

    assert_eq!(result["ghost"].state, InstallState::Error);
    let ghost = error_of(&result["ghost"]);
    assert!(matches!(ghost, InstallError::Resolve(ResolveError::NotFound { .. })));
    assert!(ghost.hint().is_some());

    // 1 good + 3 attempts for broken; ghost never downloads
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 4);
    assert_eq!(h.temp_entries(), 0);
}

#[tokio::test]
async fn at_most_three_programs_are_active() {
    let names: Vec<String> = (0..8).map(|i| format!("p{i}")).collect();
    let tags: Vec<(String, &str)> = names.iter().map(|n| (format!("o/{n}"), "v1.0.0")).collect();
    let tag_refs: Vec<(&str, &str)> = tags.iter().map(|(r, t)| (r.as_str(), *t)).collect();
    let fetcher = FakeFetcher {
        delay: Duration::from_millis(30),
        ..FakeFetcher::default()
    };
    let h = Harness::new(&tag_refs, fetcher);

    let mut run = h.orchestrator().run(names.iter().map(|n| program(n)).collect());

    let mut active = HashSet::new();
    let mut max_active = 0;
    let mut done = 0;
    while let Some(event) = run.next_event().await {
        let InstallEvent::Progress(ev) = event else {
            panic!("no picker expected");
        };
        if ev.state.is_active() {
            active.insert(ev.program.clone());
        } else if ev.state.is_terminal() {
            active.remove(&ev.program);
            assert_eq!(ev.state, InstallState::Done, "{}: {:?}", ev.program, ev.error);
            done += 1;
        }
        max_active = max_active.max(active.len());
    }

    assert_eq!(done, 8);
    assert_eq!(max_active, 3);
    assert!(h.fetcher.max_active.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn cancellation_ends_every_program_and_removes_downloads() {
    let names: Vec<String> = (0..5).map(|i| format!("p{i}")).collect();
    let tags: Vec<(String, &str)> = names.iter().map(|n| (format!("o/{n}"), "v1.0.0")).collect();
    let tag_refs: Vec<(&str, &str)> = tags.iter().map(|(r, t)| (r.as_str(), *t)).collect();
    let fetcher = FakeFetcher {
        hang: true,
        ..FakeFetcher::default()
    };
    let h = Harness::new(&tag_refs, fetcher);

    let mut run = h.orchestrator().run(names.iter().map(|n| program(n)).collect());

    let mut downloading = 0;
    let mut terminal = HashMap::new();
    let outcome = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = run.next_event().await {
            let InstallEvent::Progress(ev) = event else {
                continue;
            };
            if ev.state == InstallState::Downloading {
                downloading += 1;
                if downloading == 3 {
                    while h.fetcher.calls.load(Ordering::SeqCst) < 3 {
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                    assert_eq!(h.temp_entries(), 3);
                    run.cancel();
                }
            }
            if ev.state.is_terminal() {
                terminal.insert(ev.program.clone(), ev);
            }
        }
    })
    .await;
    assert!(outcome.is_ok(), "run did not stop after cancellation");

    assert_eq!(downloading, 3);
    assert_eq!(terminal.len(), 5);
    for ev in terminal.values() {
        assert_eq!(ev.state, InstallState::Error);
        assert!(error_of(ev).is_cancelled(), "{}: {:?}", ev.program, ev.error);
    }
    // Programs that never got a slot made no lookup
    assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 3);
    assert_eq!(h.temp_entries(), 0);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
}

/// Drive `run` to completion, cancelling once `trigger` first holds; returns
/// the terminal event of each program
async fn cancel_when(
    run: &mut ghbin::install::InstallRun,
    mut trigger: impl FnMut(&ProgressEvent) -> bool,
) -> HashMap<String, ProgressEvent> {
    let mut terminal = HashMap::new();
    let outcome = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = run.next_event().await {
            let InstallEvent::Progress(ev) = event else {
                continue;
            };
            if !run.is_cancelled() && trigger(&ev) {
                run.cancel();
            }
            if ev.state.is_terminal() {
                terminal.insert(ev.program.clone(), ev);
            }
        }
    })
    .await;
    assert!(outcome.is_ok(), "run did not stop after cancellation");
    terminal
}

#[tokio::test]
async fn cancel_during_version_lookup_downloads_nothing() {
    let h = Harness::with_resolver_delay(
        &[("o/tool", "v1.0.0")],
        FakeFetcher::default(),
        Duration::from_secs(3600),
    );
    let mut run = h.orchestrator().run(vec![program("tool")]);

    let terminal = cancel_when(&mut run, |ev| ev.state == InstallState::FetchingVersion).await;

    assert_eq!(terminal["tool"].state, InstallState::Error);
    assert!(error_of(&terminal["tool"]).is_cancelled());
    assert_eq!(h.resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.temp_entries(), 0);
}

#[tokio::test]
async fn cancel_during_retry_backoff_removes_download_dir() {
    let fetcher = FakeFetcher {
        transient_failures: AtomicUsize::new(10),
        ..FakeFetcher::default()
    };
    let h = Harness::new(&[("o/tool", "v1.0.0")], fetcher).retry(RetryPolicy {
        attempts: 3,
        base_delay: Duration::from_secs(3600),
    });
    let mut run = h.orchestrator().run(vec![program("tool")]);

    let mut terminal = HashMap::new();
    let outcome = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = run.next_event().await {
            let InstallEvent::Progress(ev) = event else {
                continue;
            };
            if ev.state == InstallState::Downloading {
                // First attempt failed; the task now sleeps before the retry
                while h.fetcher.calls.load(Ordering::SeqCst) < 1 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                assert_eq!(h.temp_entries(), 1);
                run.cancel();
            }
            if ev.state.is_terminal() {
                terminal.insert(ev.program.clone(), ev);
            }
        }
    })
    .await;
    assert!(outcome.is_ok(), "run did not stop after cancellation");

    assert_eq!(terminal["tool"].state, InstallState::Error);
    assert!(error_of(&terminal["tool"]).is_cancelled());
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.temp_entries(), 0);
    assert_eq!(marker::read(&h.paths.marker_path("tool")), None);
}

#[tokio::test]
async fn cancel_during_extraction_wins_over_extraction_error() {
    let cancel = CancellationToken::new();
    let h = Harness::new(&[("o/tool", "v1.0.0")], FakeFetcher::default()).extractor(
        CountingExtractor {
            cancel_then_fail: Some(cancel.clone()),
            ..CountingExtractor::default()
        },
    );

    let result = by_name(
        h.orchestrator()
            .run_with_cancel(vec![program("tool")], cancel)
            .finish()
            .await,
    );

    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result["tool"].state, InstallState::Error);
    assert!(
        error_of(&result["tool"]).is_cancelled(),
        "{:?}",
        result["tool"].error
    );
    assert_eq!(h.temp_entries(), 0);
    assert_eq!(h.linker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn picked_link_name_outside_link_dir_fails_program() {
    let h = Harness::new(&[("o/tool", "v1.0.0")], FakeFetcher::default());
    let outside = h.paths.share_dir.join("escaped");
    let mut run = h.orchestrator().run(vec![unlinked("tool")]);

    let mut last = None;
    while let Some(event) = run.next_event().await {
        match event {
            InstallEvent::SelectBins(request) => {
                let chosen = request.extract_dir.join("tool-1.0.0");
                let dst = outside.to_string_lossy().into_owned();
                assert!(request.respond(vec![BinLink::new(chosen.to_string_lossy(), dst)]));
            }
            InstallEvent::Progress(ev) => last = Some(ev),
        }
    }

    let last = last.expect("terminal event");
    assert_eq!(last.state, InstallState::Error);
    assert!(matches!(
        error_of(&last),
        InstallError::Link {
            source: LinkError::InvalidName { .. },
            ..
        }
    ));
    assert!(fs::symlink_metadata(&outside).is_err());
}

#[tokio::test]
async fn bin_selection_round_trip_links_chosen_files() {
    let h = Harness::new(&[("o/tool", "v3.1.0")], FakeFetcher::default());
    let mut run = h.orchestrator().run(vec![unlinked("tool")]);

    let mut states = Vec::new();
    let mut requests = 0;
    while let Some(event) = run.next_event().await {
        match event {
            InstallEvent::Progress(ev) => states.push(ev.state),
            InstallEvent::SelectBins(request) => {
                requests += 1;
                assert_eq!(states.last(), Some(&InstallState::AwaitingBinSelection));
                assert_eq!(request.program, "tool");
                assert_eq!(request.extract_dir, h.paths.install_dir("tool"));
                let chosen = request.extract_dir.join("tool-3.1.0");
                assert!(chosen.is_file());
                assert!(request.respond(vec![BinLink::new(chosen.to_string_lossy(), "mytool")]));
            }
        }
    }

    assert_eq!(requests, 1);
    assert_eq!(states.last(), Some(&InstallState::Done));
    assert_eq!(
        fs::read_link(h.paths.link_path("mytool")).expect("symlink"),
        h.paths.install_dir("tool").join("tool-3.1.0")
    );
}

#[tokio::test]
async fn empty_or_declined_selection_installs_without_links() {
    let h = Harness::new(
        &[("o/answered", "v1.0.0"), ("o/declined", "v1.0.0")],
        FakeFetcher::default(),
    );
    let mut run = h
        .orchestrator()
        .run(vec![unlinked("answered"), unlinked("declined")]);

    let mut terminal = HashMap::new();
    while let Some(event) = run.next_event().await {
        match event {
            InstallEvent::Progress(ev) if ev.state.is_terminal() => {
                terminal.insert(ev.program.clone(), ev.state);
            }
            InstallEvent::Progress(_) => {}
            InstallEvent::SelectBins(request) if request.program == "answered" => {
                assert!(request.respond(Vec::new()));
            }
            InstallEvent::SelectBins(request) => request.decline(),
        }
    }

    assert_eq!(terminal["answered"], InstallState::Done);
    assert_eq!(terminal["declined"], InstallState::Done);
    assert_eq!(h.linker.calls.load(Ordering::SeqCst), 0);
    assert_eq!(marker::read(&h.paths.marker_path("answered")).as_deref(), Some("1.0.0"));
    assert!(!h.paths.bin_dir.exists() || fs::read_dir(&h.paths.bin_dir).expect("read").count() == 0);
}

#[tokio::test]
async fn cancel_while_awaiting_selection() {
    let h = Harness::new(&[("o/tool", "v1.0.0")], FakeFetcher::default());
    let mut run = h.orchestrator().run(vec![unlinked("tool")]);

    let mut held = None;
    let mut last = None;
    while let Some(event) = run.next_event().await {
        match event {
            InstallEvent::SelectBins(request) => {
                held = Some(request);
                run.cancel();
            }
            InstallEvent::Progress(ev) => last = Some(ev),
        }
    }

    let last = last.expect("terminal event");
    assert_eq!(last.state, InstallState::Error);
    assert!(error_of(&last).is_cancelled());
    let request = held.expect("picker was requested");
    assert!(!request.respond(vec![BinLink::new("x", "x")]));
    assert_eq!(marker::read(&h.paths.marker_path("tool")), None);
}

#[tokio::test]
async fn occupied_link_destination_fails_program() {
    let h = Harness::new(&[("o/tool", "v1.0.0")], FakeFetcher::default());
    fs::create_dir_all(&h.paths.bin_dir).expect("mkdir");
    fs::write(h.paths.link_path("tool"), "hand-installed").expect("write");

    let result = by_name(h.orchestrator().run(vec![program("tool")]).finish().await);

    assert_eq!(result["tool"].state, InstallState::Error);
    assert!(matches!(
        error_of(&result["tool"]),
        InstallError::Link {
            source: LinkError::Occupied { .. },
            ..
        }
    ));
    assert_eq!(
        fs::read_to_string(h.paths.link_path("tool")).expect("read"),
        "hand-installed"
    );
}

#[tokio::test]
async fn empty_program_list_closes_stream() {
    let h = Harness::new(&[], FakeFetcher::default());
    let mut run = h.orchestrator().run(Vec::new());
    assert!(run.next_event().await.is_none());
}
