//! Drives one install run in the terminal
//!
//! Consumes the orchestrator's event stream, renders it on the progress
//! board and serves bin-selection requests one at a time, in arrival order.

use anyhow::{Context, Result};
use log::{debug, info};
use tokio::signal;

use super::picker::{PickerOutcome, pick_bins};
use super::progress::{ProgressBoard, Tally};
use crate::catalog::Program;
use crate::install::{BinSelectionRequest, InstallEvent, InstallRun, Orchestrator};

/// Install `programs` and return the final tally.
///
/// Without `interactive`, bin-selection requests get an empty answer and the
/// program is installed unlinked.
pub async fn run_install(
    orchestrator: &Orchestrator,
    programs: Vec<Program>,
    interactive: bool,
) -> Result<Tally> {
    let mut board = ProgressBoard::new(&programs)?;
    let mut run = orchestrator.run(programs);

    let token = run.cancel_token();
    let interrupt = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling install");
            token.cancel();
        }
    });

    let result = drive(&mut run, &mut board, interactive).await;

    interrupt.abort();
    board.finish();
    result?;

    let tally = board.tally();
    tally.print();
    Ok(tally)
}

async fn drive(run: &mut InstallRun, board: &mut ProgressBoard, interactive: bool) -> Result<()> {
    while let Some(event) = run.next_event().await {
        match event {
            InstallEvent::Progress(ev) => board.apply(&ev),
            InstallEvent::SelectBins(request) => {
                if run.is_cancelled() {
                    request.decline();
                } else if !interactive {
                    debug!("{}: no interaction, installing without links", request.program);
                    request.respond(Vec::new());
                } else {
                    serve_picker(run, board, request).await?;
                }
            }
        }
    }
    Ok(())
}

async fn serve_picker(
    run: &InstallRun,
    board: &ProgressBoard,
    request: BinSelectionRequest,
) -> Result<()> {
    let multi = board.multi();
    let program = request.program.clone();
    let root = request.extract_dir.clone();

    let outcome = tokio::task::spawn_blocking(move || multi.suspend(|| pick_bins(&program, &root)))
        .await
        .context("Bin picker task failed")?;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            // Unblock the waiting program before reporting
            request.decline();
            run.cancel();
            return Err(e);
        }
    };

    match outcome {
        PickerOutcome::Links(links) => {
            let program = request.program.clone();
            if !request.respond(links) {
                debug!("{program}: install ended before bin selection arrived");
            }
        }
        PickerOutcome::Aborted => {
            info!("bin selection for {} aborted, cancelling install", request.program);
            request.decline();
            run.cancel();
        }
    }
    Ok(())
}
