//! On-disk archive format.
//!
//! Each backup is one JSON file named `<uuid>.json`:
//!
//! ```text
//! { "format_version": 1, "id": "...", "label": null,
//!   "created_at": 1700000000000, "resource_count": 2, "resources": [...] }
//! ```

use super::{BackupError, BackupResult};
use crate::model::backup::{Backup, BackupId};
use crate::model::resource::Resource;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

const ARCHIVE_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BackupArchive {
    pub format_version: u32,
    pub id: BackupId,
    pub label: Option<String>,
    pub created_at: i64,
    pub resource_count: usize,
    pub resources: Vec<Resource>,
}

/// Header-only view; `resources` is skipped while decoding.
#[derive(Debug, Deserialize)]
struct ArchiveHeader {
    format_version: u32,
    id: BackupId,
    label: Option<String>,
    created_at: i64,
    resource_count: usize,
}

impl BackupArchive {
    pub fn new(backup: &Backup, resources: Vec<Resource>) -> Self {
        Self {
            format_version: ARCHIVE_FORMAT_VERSION,
            id: backup.id,
            label: backup.label.clone(),
            created_at: backup.created_at,
            resource_count: resources.len(),
            resources,
        }
    }
}

pub(crate) fn archive_path(dir: &Path, id: BackupId) -> PathBuf {
    dir.join(format!("{id}.{ARCHIVE_EXTENSION}"))
}

/// Returns the backup id encoded in an archive file name.
pub(crate) fn archive_id(path: &Path) -> Option<BackupId> {
    if path.extension()? != ARCHIVE_EXTENSION {
        return None;
    }
    BackupId::parse_str(path.file_stem()?.to_str()?).ok()
}

pub(crate) fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(TEMP_SUFFIX))
}

/// Publishes `archive` under `dir` via temp file, fsync and rename.
///
/// On failure the temp file is removed and no archive becomes visible.
pub(crate) fn write_archive(dir: &Path, archive: &BackupArchive) -> BackupResult<PathBuf> {
    let bytes = serde_json::to_vec_pretty(archive).map_err(BackupError::Serialize)?;
    let final_path = archive_path(dir, archive.id);
    let temp_path = dir.join(format!(
        "{}.{ARCHIVE_EXTENSION}{TEMP_SUFFIX}",
        archive.id
    ));

    let publish = || -> std::io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &final_path)?;
        sync_dir(dir)
    };

    if let Err(err) = publish() {
        if let Err(cleanup_err) = fs::remove_file(&temp_path) {
            if cleanup_err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "event=backup_create module=backup status=warn path={} error={}",
                    temp_path.display(),
                    cleanup_err
                );
            }
        }
        return Err(BackupError::io(&final_path, err));
    }
    Ok(final_path)
}

pub(crate) fn read_archive(path: &Path) -> BackupResult<BackupArchive> {
    let bytes = fs::read(path).map_err(|err| BackupError::io(path, err))?;
    let archive: BackupArchive =
        serde_json::from_slice(&bytes).map_err(|err| invalid(path, err.to_string()))?;
    check_format(path, archive.format_version)?;
    if archive.resources.len() != archive.resource_count {
        return Err(invalid(
            path,
            format!(
                "resource_count {} does not match payload length {}",
                archive.resource_count,
                archive.resources.len()
            ),
        ));
    }
    Ok(archive)
}

pub(crate) fn read_header(path: &Path) -> BackupResult<Backup> {
    let file = File::open(path).map_err(|err| BackupError::io(path, err))?;
    let header: ArchiveHeader = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|err| invalid(path, err.to_string()))?;
    check_format(path, header.format_version)?;
    Ok(Backup {
        id: header.id,
        label: header.label,
        created_at: header.created_at,
        resource_count: header.resource_count,
    })
}

fn check_format(path: &Path, format_version: u32) -> BackupResult<()> {
    if format_version == 0 || format_version > ARCHIVE_FORMAT_VERSION {
        return Err(BackupError::UnsupportedFormat {
            path: path.to_path_buf(),
            format_version,
        });
    }
    Ok(())
}

fn invalid(path: &Path, message: String) -> BackupError {
    BackupError::InvalidArchive {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{archive_id, is_temp_file};
    use std::path::Path;

    #[test]
    fn archive_id_requires_uuid_stem_and_json_extension() {
        let id = "0b8f5b5e-6f3c-4d8e-9a63-6e0f0d6b9b11";
        assert!(archive_id(Path::new(&format!("/b/{id}.json"))).is_some());
        assert!(archive_id(Path::new(&format!("/b/{id}.json.tmp"))).is_none());
        assert!(archive_id(Path::new("/b/notes.json")).is_none());
    }

    #[test]
    fn temp_files_are_recognized() {
        assert!(is_temp_file(Path::new("/b/x.json.tmp")));
        assert!(!is_temp_file(Path::new("/b/x.json")));
    }
}
