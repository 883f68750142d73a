//! Program catalog: the declarative list of installable programs
//!
//! ```toml
//! [programs.fzf]
//! repo          = "junegunn/fzf"
//! asset_pattern = "fzf-{version}-linux_amd64.tar.gz"
//! packages      = []
//! bin           = [{ src = "fzf", dst = "fzf" }]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::install::is_plain_name;

/// Placeholder replaced by the resolved release version
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// One executable to expose: archive-relative (or absolute) source and link name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinLink {
    pub src: String,
    pub dst: String,
}

impl BinLink {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Source path with `{version}` substituted
    pub fn resolved_src(&self, version: &str) -> String {
        self.src.replace(VERSION_PLACEHOLDER, version)
    }
}

/// A single installable entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Populated from the TOML table key
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub asset_pattern: String,
    /// System commands that must be on PATH before installing
    #[serde(default)]
    pub packages: Vec<String>,
    /// Empty means the operator picks executables after extraction
    #[serde(default)]
    pub bin: Vec<BinLink>,
}

impl Program {
    /// Release asset file name for `version`
    pub fn asset_name(&self, version: &str) -> String {
        self.asset_pattern.replace(VERSION_PLACEHOLDER, version)
    }

    pub fn needs_bin_selection(&self) -> bool {
        self.bin.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    programs: BTreeMap<String, Program>,
}

/// Parse and validate a catalog file, returning programs sorted by name
pub fn load(path: &Path) -> Result<Vec<Program>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    parse(&content).with_context(|| format!("Invalid catalog {}", path.display()))
}

/// Parse and validate catalog text
pub fn parse(content: &str) -> Result<Vec<Program>> {
    let raw: RawCatalog = toml::from_str(content).context("parse catalog")?;

    let mut errors = Vec::new();
    let mut programs = Vec::with_capacity(raw.programs.len());

    // BTreeMap iteration keeps the result sorted by name
    for (name, mut program) in raw.programs {
        program.name = name;
        let mut field_errors = Vec::new();
        // Names become directory and link names
        if !is_plain_name(&program.name) {
            field_errors.push("program name must be a single file name");
        }
        if program.repo.trim().is_empty() {
            field_errors.push("repo is required");
        }
        if program.asset_pattern.trim().is_empty() {
            field_errors.push("asset_pattern is required");
        }
        if program.bin.iter().any(|b| b.src.is_empty() || b.dst.is_empty()) {
            field_errors.push("bin entries need both src and dst");
        } else if program.bin.iter().any(|b| !is_plain_name(&b.dst)) {
            field_errors.push("bin dst must be a single file name");
        }
        if !program.asset_pattern.trim().is_empty() && !is_plain_name(&program.asset_pattern) {
            field_errors.push("asset_pattern must be a single file name");
        }
        if !field_errors.is_empty() {
            errors.push(format!("[{}]: {}", program.name, field_errors.join(", ")));
            continue;
        }
        programs.push(program);
    }

    if !errors.is_empty() {
        return Err(anyhow!("catalog validation errors:\n{}", errors.join("\n")));
    }
    if programs.is_empty() {
        return Err(anyhow!("catalog defines no programs"));
    }

    Ok(programs)
}
