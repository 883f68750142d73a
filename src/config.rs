use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};

use crate::install::RetryPolicy;

/// Install root relative to the home directory (one sub-directory per program)
pub const SHARE_DIR: &str = ".local/share";
/// Link directory relative to the home directory
pub const BIN_DIR: &str = ".local/bin";
/// Name of the per-program version marker file
pub const VERSION_MARKER: &str = ".version";

/// Persistent installer configuration (`~/.config/ghbin/config.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Overrides `~/.local/share`
    pub share_dir: Option<PathBuf>,
    /// Overrides `~/.local/bin`
    pub bin_dir: Option<PathBuf>,
    /// Programs allowed mid-pipeline at once
    pub concurrency: usize,
    pub download_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub api_base_url: String,
    pub download_base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub inactivity_timeout_secs: u64,

    /// Read from `GITHUB_TOKEN`, never persisted
    #[serde(skip)]
    pub github_token: Option<String>,
    /// Parent of task-private download directories; system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            share_dir: None,
            bin_dir: None,
            concurrency: 3,
            download_attempts: 3,
            retry_base_delay_ms: 1000,
            api_base_url: "https://api.github.com".to_string(),
            download_base_url: "https://github.com".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 30,
            inactivity_timeout_secs: 300,
            github_token: None,
            temp_dir: None,
        }
    }
}

impl InstallerConfig {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join("ghbin")
            .join("config.toml"))
    }

    /// Load the config file, writing a default one first if it does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config not found at {}, creating default configuration", path.display());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            let default_toml = toml::to_string_pretty(&Self::default())
                .context("Failed to serialize default config")?;
            fs::write(path, default_toml).context("Failed to write config file")?;
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Pick up `GITHUB_TOKEN` from the environment
    pub fn with_env(mut self) -> Self {
        self.github_token = std::env::var("GITHUB_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.download_attempts == 0 {
            anyhow::bail!("download_attempts must be at least 1");
        }
        Ok(())
    }

    /// Resolve install and link directories, falling back to the home directory
    pub fn paths(&self) -> Result<InstallPaths> {
        let home = || {
            dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
        };
        let share_dir = match &self.share_dir {
            Some(dir) => dir.clone(),
            None => home()?.join(SHARE_DIR),
        };
        let bin_dir = match &self.bin_dir {
            Some(dir) => dir.clone(),
            None => home()?.join(BIN_DIR),
        };
        Ok(InstallPaths::new(share_dir, bin_dir))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.download_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Deterministic on-disk locations derived from program and link names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub share_dir: PathBuf,
    pub bin_dir: PathBuf,
}

impl InstallPaths {
    pub fn new(share_dir: PathBuf, bin_dir: PathBuf) -> Self {
        Self { share_dir, bin_dir }
    }

    pub fn install_dir(&self, program: &str) -> PathBuf {
        self.share_dir.join(program)
    }

    pub fn marker_path(&self, program: &str) -> PathBuf {
        self.install_dir(program).join(VERSION_MARKER)
    }

    pub fn link_path(&self, link_name: &str) -> PathBuf {
        self.bin_dir.join(link_name)
    }
}
