//! ghbin: install command-line programs from their latest GitHub release
//!
//! For each selected catalog entry the installer resolves the latest release,
//! skips it when the recorded version already matches, otherwise downloads,
//! extracts and links its executables into the link directory. Programs run
//! concurrently under a small slot budget and report through one event
//! stream that the terminal front end renders.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod frontend;
pub mod install;
pub mod preflight;
