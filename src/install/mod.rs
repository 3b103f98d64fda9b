use std::fs;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use log::info;
use sha2::{Digest, Sha256};
use tar::Archive;
use zip::read::ZipArchive;

use crate::error::LauncherError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

/// Infer the archive format from the artifact file name.
pub fn guess_archive_kind(name: &str) -> Option<ArchiveKind> {
    if name.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else {
        None
    }
}

/// Unpack `archive_path` into `dest`, creating directories as needed.
pub fn extract_archive(
    archive_path: &Path,
    dest: &Path,
    kind: ArchiveKind,
) -> Result<(), LauncherError> {
    info!(
        "install: extracting {} as {:?} into {}",
        archive_path.display(),
        kind,
        dest.display()
    );
    fs::create_dir_all(dest)
        .map_err(|e| LauncherError::io(format!("failed to create install dir: {e}")))?;
    match kind {
        ArchiveKind::Zip => extract_zip(archive_path, dest),
        ArchiveKind::TarGz => extract_targz(archive_path, dest),
    }
}

/// Compare the SHA-256 of `path` against `expected` (hex, case-insensitive).
pub fn verify_sha256(path: &Path, expected: &str) -> Result<(), LauncherError> {
    let mut file =
        fs::File::open(path).map_err(|e| LauncherError::io(format!("checksum open error: {e}")))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| LauncherError::io(format!("checksum read error: {e}")))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    let actual = format!("{:x}", hasher.finalize());
    if actual != expected.trim().to_lowercase() {
        return Err(LauncherError::parse(format!(
            "checksum mismatch: expected {expected}, got {actual}"
        )));
    }
    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), LauncherError> {
    let file =
        fs::File::open(archive_path).map_err(|e| LauncherError::io(format!("zip open error: {e}")))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| LauncherError::io(format!("zip parse error: {e}")))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| LauncherError::io(format!("zip entry error: {e}")))?;
        let out_path = dest.join(entry.mangled_name());
        if entry.name().ends_with('/') {
            fs::create_dir_all(&out_path)
                .map_err(|e| LauncherError::io(format!("zip dir create error: {e}")))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LauncherError::io(format!("zip parent dir error: {e}")))?;
        }
        let mut out_file = fs::File::create(&out_path)
            .map_err(|e| LauncherError::io(format!("zip create file error: {e}")))?;
        io::copy(&mut entry, &mut out_file)
            .map_err(|e| LauncherError::io(format!("zip write error: {e}")))?;
    }
    Ok(())
}

fn extract_targz(archive_path: &Path, dest: &Path) -> Result<(), LauncherError> {
    let file = fs::File::open(archive_path)
        .map_err(|e| LauncherError::io(format!("tar.gz open error: {e}")))?;
    let dec = GzDecoder::new(file);
    let mut archive = Archive::new(dec);
    archive
        .unpack(dest)
        .map_err(|e| LauncherError::io(format!("tar.gz extract error: {e}")))
}
