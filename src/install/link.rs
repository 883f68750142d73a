//! Symlink publication into the link directory

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use log::debug;

use super::error::LinkError;

/// Exposes an installed executable under a name in a directory
pub trait LinkPublisher: Send + Sync {
    /// Create `dir/name -> source`, returning the link path
    fn link(&self, source: &Path, dir: &Path, name: &str) -> Result<PathBuf, LinkError>;
}

/// `LinkPublisher` creating real symbolic links
#[derive(Debug, Default, Clone, Copy)]
pub struct SymlinkPublisher;

impl LinkPublisher for SymlinkPublisher {
    fn link(&self, source: &Path, dir: &Path, name: &str) -> Result<PathBuf, LinkError> {
        link(source, dir, name)
    }
}

/// Whether `name` is exactly one normal path component.
///
/// Rejects empty names, `.`, `..`, absolute paths and anything with a
/// separator, so `dir.join(name)` always stays directly inside `dir`.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

/// Create a symlink at `dir/name` pointing to `source`.
///
/// An existing symlink is replaced; any other existing entry is left alone
/// and reported as `LinkError::Occupied`. `name` must pass [`is_plain_name`].
pub fn link(source: &Path, dir: &Path, name: &str) -> Result<PathBuf, LinkError> {
    if !is_plain_name(name) {
        return Err(LinkError::InvalidName {
            name: name.to_string(),
        });
    }
    let target = dir.join(name);
    let fs_err = |source: io::Error| LinkError::Filesystem {
        path: target.clone(),
        source,
    };

    match fs::symlink_metadata(&target) {
        Ok(meta) if meta.file_type().is_symlink() => {
            debug!("replacing existing symlink {}", target.display());
            fs::remove_file(&target).map_err(fs_err)?;
        }
        Ok(_) => return Err(LinkError::Occupied { path: target }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(fs_err(e)),
    }

    fs::create_dir_all(dir).map_err(fs_err)?;
    create_symlink(source, &target).map_err(fs_err)?;
    Ok(target)
}

#[cfg(unix)]
fn create_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn create_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, target)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_source: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}
