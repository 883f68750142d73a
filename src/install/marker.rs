//! Per-program version marker
//!
//! The marker is the only persisted install state. A missing, unreadable or
//! blank marker means "not installed", never an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

/// Installed version recorded at `path`, if any
pub fn read(path: &Path) -> Option<String> {
    parse(path, fs::read(path))
}

/// Record `version` at `path`, creating the parent directory if needed
pub fn write(path: &Path, version: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, version)
}

/// Whether the marker at `path` already records `version`
pub fn is_current(path: &Path, version: &str) -> bool {
    read(path).as_deref() == Some(version)
}

/// [`read`] on the async filesystem
pub async fn read_async(path: &Path) -> Option<String> {
    parse(path, tokio::fs::read(path).await)
}

/// [`write`] on the async filesystem
pub async fn write_async(path: PathBuf, version: String) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, version).await
}

/// [`is_current`] on the async filesystem
pub async fn is_current_async(path: &Path, version: &str) -> bool {
    read_async(path).await.as_deref() == Some(version)
}

fn parse(path: &Path, read: io::Result<Vec<u8>>) -> Option<String> {
    let bytes = match read {
        Ok(bytes) => bytes,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                debug!("ignoring unreadable version marker {}: {e}", path.display());
            }
            return None;
        }
    };
    let text = String::from_utf8(bytes).ok()?;
    let version = text.trim();
    if version.is_empty() || version.contains(char::is_control) {
        debug!("ignoring unparsable version marker {}", path.display());
        return None;
    }
    Some(version.to_string())
}
