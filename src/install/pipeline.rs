//! Per-program install pipeline
//!
//! `pending -> fetching version -> downloading -> extracting ->
//! [awaiting bin selection] -> linking -> done`, with `skipped` and `error`
//! as alternate terminals. One task runs one pipeline and is the only
//! producer of that program's events.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::download::{ArtifactFetcher, RetryPolicy, download_with_retry};
use super::error::InstallError;
use super::extract::ArchiveExtractor;
use super::link::LinkPublisher;
use super::marker;
use super::resolver::ReleaseResolver;
use super::state::{BinSelectionRequest, EventSink, InstallRecord, InstallState};
use crate::catalog::{BinLink, Program};
use crate::config::InstallPaths;

/// Everything a pipeline needs besides the program itself
pub(crate) struct PipelineContext {
    pub(crate) resolver: Arc<dyn ReleaseResolver>,
    pub(crate) fetcher: Arc<dyn ArtifactFetcher>,
    pub(crate) extractor: Arc<dyn ArchiveExtractor>,
    pub(crate) linker: Arc<dyn LinkPublisher>,
    pub(crate) paths: InstallPaths,
    pub(crate) retry: RetryPolicy,
    pub(crate) download_base_url: String,
    pub(crate) temp_root: PathBuf,
}

/// `<base>/<owner>/<name>/releases/download/<tag>/<asset>`
fn release_asset_url(base: &str, repo: &str, tag: &str, asset: &str) -> String {
    format!(
        "{}/{}/releases/download/{}/{}",
        base.trim_end_matches('/'),
        repo,
        tag,
        asset
    )
}

enum Outcome {
    Installed,
    UpToDate,
}

/// Admit `program` through `slots`, run its pipeline and return the terminal state
pub(crate) async fn install(
    ctx: Arc<PipelineContext>,
    program: Program,
    sink: EventSink,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
) -> InstallState {
    let mut record = InstallRecord::new(&program.name, sink);

    // Held until the terminal event is out, so a freed slot is never
    // observed before the program that held it has finished.
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            record.fail(InstallError::Cancelled);
            return record.state();
        }
        permit = slots.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                record.fail(InstallError::Cancelled);
                return record.state();
            }
        },
    };

    match run(&ctx, &program, &mut record, &cancel).await {
        Ok(Outcome::Installed) => {
            info!("{} installed", program.name);
            record.transition(InstallState::Done);
        }
        Ok(Outcome::UpToDate) => {
            info!("{} already up to date", program.name);
            record.transition(InstallState::Skipped);
        }
        Err(e) => {
            if e.is_cancelled() {
                info!("{} cancelled during {}", program.name, record.state());
            } else {
                warn!("{} failed during {}: {e}", program.name, record.state());
            }
            record.fail(e);
        }
    }

    record.state()
}

async fn run(
    ctx: &PipelineContext,
    program: &Program,
    record: &mut InstallRecord,
    cancel: &CancellationToken,
) -> Result<Outcome, InstallError> {
    record.transition(InstallState::FetchingVersion);

    let release = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(InstallError::Cancelled),
        release = ctx.resolver.latest_release(&program.repo) => release?,
    };
    record.set_version(&release.version);

    let install_dir = ctx.paths.install_dir(&program.name);
    let marker_path = ctx.paths.marker_path(&program.name);
    if marker::is_current_async(&marker_path, &release.version).await {
        return Ok(Outcome::UpToDate);
    }

    let asset = program.asset_name(&release.version);
    let url = release_asset_url(&ctx.download_base_url, &program.repo, &release.tag, &asset);
    debug!("{}: version={} url={}", program.name, release.version, url);

    record.transition(InstallState::Downloading);

    // Task-private scratch dir; removed on drop whatever the outcome
    tokio::fs::create_dir_all(&ctx.temp_root)
        .await
        .map_err(|source| InstallError::Filesystem {
            context: format!("create temp root {}", ctx.temp_root.display()),
            source,
        })?;
    let scratch = tempfile::Builder::new()
        .prefix(&format!("ghbin-{}-", program.name))
        .tempdir_in(&ctx.temp_root)
        .map_err(|source| InstallError::Filesystem {
            context: "create download directory".to_string(),
            source,
        })?;
    let artifact = scratch.path().join(&asset);

    let bytes =
        download_with_retry(ctx.fetcher.as_ref(), &url, &artifact, ctx.retry, cancel).await?;
    debug!("{}: downloaded {bytes} bytes", program.name);

    record.transition(InstallState::Extracting);

    let extractor = Arc::clone(&ctx.extractor);
    let dest = install_dir.clone();
    let extracted = tokio::task::spawn_blocking(move || extractor.extract(&artifact, &dest))
        .await
        .map_err(|e| InstallError::Internal(format!("extraction task failed: {e}")))?;

    if let Err(e) = scratch.close() {
        debug!("{}: failed to remove download directory: {e}", program.name);
    }
    // Cancellation wins over whatever extraction reported
    if cancel.is_cancelled() {
        return Err(InstallError::Cancelled);
    }
    let format = extracted?;
    debug!("{}: extracted {format:?} into {}", program.name, install_dir.display());

    record.links = if program.needs_bin_selection() {
        select_bins(program, &install_dir, record, cancel).await?
    } else {
        program
            .bin
            .iter()
            .map(|b| BinLink::new(b.resolved_src(&release.version), b.dst.clone()))
            .collect()
    };

    record.transition(InstallState::Linking);

    marker::write_async(marker_path.clone(), release.version.clone())
        .await
        .map_err(|source| InstallError::Marker {
            path: marker_path.clone(),
            source,
        })?;

    // First failure stops; links already created stay in place
    for link in &record.links {
        let source = install_dir.join(&link.src);
        let published = ctx
            .linker
            .link(&source, &ctx.paths.bin_dir, &link.dst)
            .map_err(|source| InstallError::Link {
                name: link.dst.clone(),
                source,
            })?;
        debug!("{}: linked {} -> {}", program.name, published.display(), source.display());
    }

    Ok(Outcome::Installed)
}

/// Ask the front end which executables to link and wait for exactly one reply
async fn select_bins(
    program: &Program,
    install_dir: &std::path::Path,
    record: &mut InstallRecord,
    cancel: &CancellationToken,
) -> Result<Vec<BinLink>, InstallError> {
    record.transition(InstallState::AwaitingBinSelection);

    let (request, reply) = BinSelectionRequest::new(program.name.clone(), install_dir.to_path_buf());
    record.request_bins(request);

    let chosen = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(InstallError::Cancelled),
        reply = reply => reply.unwrap_or_else(|_| {
            debug!("{}: bin selection closed without reply", program.name);
            Vec::new()
        }),
    };

    // A closed channel during shutdown still ends as cancelled
    if cancel.is_cancelled() {
        return Err(InstallError::Cancelled);
    }
    Ok(chosen)
}
