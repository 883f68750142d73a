//! Release artifact extraction
//!
//! Dispatches on the artifact's file name: gzip/xz/bzip2 tarballs and zip
//! archives are unpacked, anything else is treated as a bare executable and
//! copied with the executable bit set.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use log::debug;
use tar::Archive;
use xz2::read::XzDecoder;
use zip::ZipArchive;
use zip::result::ZipError;

use super::error::ExtractError;

/// Archive format selected by file-name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    TarBz2,
    Zip,
    /// Single executable, copied as-is
    Raw,
}

impl ArchiveFormat {
    /// Pick the format for a file name. Total: unknown suffixes are `Raw`.
    pub fn detect(file_name: &str) -> Self {
        let name = file_name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::TarGz
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Self::TarXz
        } else if name.ends_with(".tar.bz2") {
            Self::TarBz2
        } else if name.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Raw
        }
    }
}

/// Unpacks a downloaded artifact into a destination directory
pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, artifact: &Path, dest: &Path) -> Result<ArchiveFormat, ExtractError>;
}

/// Suffix-dispatching extractor backed by `tar`, `zip` and the decompressors
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatExtractor;

impl ArchiveExtractor for FormatExtractor {
    fn extract(&self, artifact: &Path, dest: &Path) -> Result<ArchiveFormat, ExtractError> {
        extract(artifact, dest)
    }
}

/// Extract `artifact` into `dest`, creating `dest` if needed
pub fn extract(artifact: &Path, dest: &Path) -> Result<ArchiveFormat, ExtractError> {
    let file_name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ExtractError::UnsupportedFormat {
            path: artifact.to_path_buf(),
        })?;
    let format = ArchiveFormat::detect(file_name);
    debug!("extracting {} as {format:?} into {}", artifact.display(), dest.display());

    fs::create_dir_all(dest).map_err(|e| fs_error(dest, e))?;

    match format {
        ArchiveFormat::TarGz => unpack_tar(artifact, dest, GzDecoder::new),
        ArchiveFormat::TarXz => unpack_tar(artifact, dest, XzDecoder::new),
        ArchiveFormat::TarBz2 => unpack_tar(artifact, dest, BzDecoder::new),
        ArchiveFormat::Zip => unpack_zip(artifact, dest),
        ArchiveFormat::Raw => copy_executable(artifact, dest, file_name),
    }?;

    Ok(format)
}

fn fs_error(path: &Path, source: io::Error) -> ExtractError {
    ExtractError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}

/// Decoder and archive-structure failures surface as these kinds
fn is_corruption(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof
    )
}

fn corrupt(artifact: &Path, err: impl std::fmt::Display) -> ExtractError {
    ExtractError::Corrupt {
        path: artifact.to_path_buf(),
        message: err.to_string(),
    }
}

fn classify(artifact: &Path, dest: &Path, err: io::Error) -> ExtractError {
    if is_corruption(&err) {
        corrupt(artifact, err)
    } else {
        fs_error(dest, err)
    }
}

fn unpack_tar<R, F>(artifact: &Path, dest: &Path, decoder: F) -> Result<(), ExtractError>
where
    R: Read,
    F: FnOnce(BufReader<File>) -> R,
{
    let file = File::open(artifact).map_err(|e| fs_error(artifact, e))?;
    let mut archive = Archive::new(decoder(BufReader::new(file)));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    // Header and decoder errors while walking entries mean a damaged archive
    let entries = archive.entries().map_err(|e| corrupt(artifact, e))?;
    let mut unpacked = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| corrupt(artifact, e))?;
        // unpack_in refuses paths escaping `dest`
        entry
            .unpack_in(dest)
            .map_err(|e| classify(artifact, dest, e))?;
        unpacked += 1;
    }
    debug!("unpacked {unpacked} tar entries from {}", artifact.display());
    Ok(())
}

fn unpack_zip(artifact: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(artifact).map_err(|e| fs_error(artifact, e))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(artifact, dest, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| zip_error(artifact, dest, e))?;

        // Skip entries whose names would escape `dest`
        let Some(relative) = entry.enclosed_name() else {
            debug!("skipping unsafe zip entry {:?}", entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| fs_error(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_error(parent, e))?;
        }

        let mut out = File::create(&target).map_err(|e| fs_error(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| classify(artifact, &target, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            set_mode(&target, mode & 0o7777)?;
        }
    }
    Ok(())
}

fn zip_error(artifact: &Path, dest: &Path, err: ZipError) -> ExtractError {
    match err {
        ZipError::Io(e) => classify(artifact, dest, e),
        other => corrupt(artifact, other),
    }
}

fn copy_executable(artifact: &Path, dest: &Path, file_name: &str) -> Result<(), ExtractError> {
    let target: PathBuf = dest.join(file_name);
    fs::copy(artifact, &target).map_err(|e| fs_error(&target, e))?;
    #[cfg(unix)]
    set_mode(&target, 0o755)?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| fs_error(path, e))
}
