use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use ghbin::catalog;
use ghbin::cli::Args;
use ghbin::config::InstallerConfig;
use ghbin::frontend;
use ghbin::install::Orchestrator;
use ghbin::preflight;

fn main() {
    let args = Args::parse();

    // Quiet by default so log lines do not tear through the progress board
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    match rt.block_on(real_main(args)) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns `false` when any program failed
async fn real_main(args: Args) -> Result<bool> {
    let cfg_path = match &args.config {
        Some(path) => path.clone(),
        None => InstallerConfig::default_path()?,
    };
    let mut cfg = InstallerConfig::load_or_create(&cfg_path)?.with_env();
    if let Some(concurrency) = args.concurrency {
        cfg.concurrency = concurrency;
    }
    if let Some(dir) = &args.share_dir {
        cfg.share_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.bin_dir {
        cfg.bin_dir = Some(dir.clone());
    }
    cfg.validate()?;
    info!("Using config from: {}", cfg_path.display());

    let programs = catalog::load(&args.catalog)?;

    let selected = if args.all {
        programs
    } else if !args.only.is_empty() {
        frontend::filter_only(programs, &args.only)?
    } else if args.no_interaction {
        anyhow::bail!("--no-interaction needs --all or --only to choose programs");
    } else {
        tokio::task::spawn_blocking(move || frontend::prompt_programs(programs))
            .await
            .context("Program selection task failed")??
    };
    if selected.is_empty() {
        println!("Nothing selected.");
        return Ok(true);
    }

    preflight::check_commands(&selected)?;
    let paths = cfg.paths()?;
    preflight::ensure_base_dirs(&paths)?;

    let orchestrator = Orchestrator::from_config(&cfg)?;
    let tally = frontend::run_install(&orchestrator, selected, !args.no_interaction).await?;

    Ok(!tally.has_failures())
}
