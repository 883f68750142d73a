//! Checks run once before any install starts

use std::fs;

use anyhow::{Context, Result, bail};
use log::debug;

use crate::catalog::Program;
use crate::config::InstallPaths;

/// Union of the programs' required system commands, first-seen order
pub fn required_commands(programs: &[Program]) -> Vec<String> {
    let mut seen = Vec::new();
    for cmd in programs.iter().flat_map(|p| p.packages.iter()) {
        if !seen.contains(cmd) {
            seen.push(cmd.clone());
        }
    }
    seen
}

/// Commands from `required` that cannot be found on `PATH`
pub fn missing_commands(required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|cmd| match which::which(cmd.as_str()) {
            Ok(path) => {
                debug!("found {cmd} at {}", path.display());
                false
            }
            Err(_) => true,
        })
        .cloned()
        .collect()
}

/// Fail with a listing when any required command is missing
pub fn check_commands(programs: &[Program]) -> Result<()> {
    let missing = missing_commands(&required_commands(programs));
    if !missing.is_empty() {
        bail!(
            "missing required commands: {}\ninstall them with your system package manager and retry",
            missing.join(", ")
        );
    }
    Ok(())
}

/// Create the install root and the link directory
pub fn ensure_base_dirs(paths: &InstallPaths) -> Result<()> {
    for dir in [&paths.share_dir, &paths.bin_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}
