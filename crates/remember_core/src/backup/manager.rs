//! Backup catalog and restore orchestration.
//!
//! # Responsibility
//! - Capture consistent snapshots of the store into archive files.
//! - Swap an archive back into the store under exclusive access.
//! - List and delete catalog entries.
//!
//! # Invariants
//! - Unknown or malformed ids are `NotFound`; they never touch the catalog.
//! - An archive is fully read and decoded before the store is locked.
//! - Catalog listing is ordered by `created_at DESC, id ASC`.
//! - `created_at` is strictly increasing across backups made by one process.
//! - Listing skips unreadable archives with a warning; `get`/`restore` on
//!   such an id still report the underlying error.

use super::archive::{
    archive_id, archive_path, is_temp_file, read_archive, read_header, write_archive,
    BackupArchive,
};
use super::{BackupError, BackupResult};
use crate::model::backup::{Backup, BackupId};
use crate::model::epoch_millis_now;
use crate::store::ResourceStore;
use log::{error, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

static LAST_BACKUP_AT: AtomicI64 = AtomicI64::new(0);

/// Options for [`BackupManager::restore_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Snapshot the live store before replacing it.
    pub backup_current: bool,
}

/// Result of a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub restored: Backup,
    /// Safety snapshot taken when `backup_current` was requested.
    pub safety_backup: Option<Backup>,
    pub resource_count: usize,
}

/// Backup manager bound to one store and one catalog directory.
pub struct BackupManager<'store> {
    store: &'store ResourceStore,
    dir: PathBuf,
}

impl<'store> BackupManager<'store> {
    /// Binds a manager, creating the catalog directory when missing.
    pub fn new(store: &'store ResourceStore, dir: impl Into<PathBuf>) -> BackupResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| BackupError::io(&dir, err))?;
        Ok(Self { store, dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshots every resource into a new archive.
    ///
    /// # Errors
    /// - `BackupError::Io` when the archive cannot be published; no partial
    ///   archive is left behind.
    pub fn create(&self, label: Option<&str>) -> BackupResult<Backup> {
        let started_at = Instant::now();
        let resources = self.store.snapshot()?;
        let backup = Backup::new(label, next_backup_timestamp(), resources.len());
        let archive = BackupArchive::new(&backup, resources);

        match write_archive(&self.dir, &archive) {
            Ok(_) => {
                info!(
                    "event=backup_create module=backup status=ok id={} resources={} duration_ms={}",
                    backup.id,
                    backup.resource_count,
                    started_at.elapsed().as_millis()
                );
                Ok(backup)
            }
            Err(err) => {
                error!(
                    "event=backup_create module=backup status=error id={} error={}",
                    backup.id, err
                );
                Err(err)
            }
        }
    }

    /// Replaces the live store with backup `id`.
    pub fn restore(&self, id: &str) -> BackupResult<()> {
        self.restore_with(id, RestoreOptions::default()).map(|_| ())
    }

    /// Replaces the live store with backup `id`, optionally snapshotting the
    /// current state first.
    ///
    /// # Errors
    /// - `BackupError::NotFound` when `id` is unknown; nothing changes.
    /// - Storage errors roll the swap back; the previous table stays live.
    pub fn restore_with(&self, id: &str, options: RestoreOptions) -> BackupResult<RestoreOutcome> {
        let started_at = Instant::now();
        let path = self.existing_archive_path(id)?;
        let archive = read_archive(&path)?;
        let backup_id = resolve_id(id)?;
        if archive.id != backup_id {
            return Err(BackupError::InvalidArchive {
                path,
                message: format!("archive id {} does not match file name", archive.id),
            });
        }

        let safety_backup = if options.backup_current {
            Some(self.create(Some(&format!("before restore {backup_id}")))?)
        } else {
            None
        };

        let resource_count = match self.store.replace_all(&archive.resources) {
            Ok(count) => count,
            Err(err) => {
                error!(
                    "event=backup_restore module=backup status=error id={} error_kind={} error={}",
                    backup_id,
                    err.kind(),
                    err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=backup_restore module=backup status=ok id={} resources={} duration_ms={}",
            backup_id,
            resource_count,
            started_at.elapsed().as_millis()
        );

        Ok(RestoreOutcome {
            restored: Backup {
                id: archive.id,
                label: archive.label,
                created_at: archive.created_at,
                resource_count: archive.resource_count,
            },
            safety_backup,
            resource_count,
        })
    }

    /// Metadata for one backup, `None` when absent.
    pub fn get(&self, id: &str) -> BackupResult<Option<Backup>> {
        match self.existing_archive_path(id) {
            Ok(path) => read_header(&path).map(Some),
            Err(BackupError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// All readable backups, most recent first.
    ///
    /// Archives whose header cannot be read are logged and left out.
    pub fn list(&self) -> BackupResult<Vec<Backup>> {
        let mut backups = Vec::new();
        for path in self.archive_paths()? {
            match read_header(&path) {
                Ok(backup) => backups.push(backup),
                Err(err) => warn!(
                    "event=backup_list module=backup status=warn path={} error_kind={} error={}",
                    path.display(),
                    err.kind(),
                    err
                ),
            }
        }
        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(backups)
    }

    /// Deletes one backup; `NotFound` when it does not exist.
    pub fn remove(&self, id: &str) -> BackupResult<bool> {
        let path = self.existing_archive_path(id)?;
        fs::remove_file(&path).map_err(|err| BackupError::io(&path, err))?;
        info!("event=backup_remove module=backup status=ok id={id}");
        Ok(true)
    }

    /// Deletes every backup and returns how many were removed.
    ///
    /// Leftover temp files from interrupted creates are swept too but not
    /// counted.
    pub fn clear(&self) -> BackupResult<usize> {
        let mut removed = 0;
        for path in self.archive_paths()? {
            fs::remove_file(&path).map_err(|err| BackupError::io(&path, err))?;
            removed += 1;
        }
        for path in self.dir_entries()?.into_iter().filter(|p| is_temp_file(p)) {
            if let Err(err) = fs::remove_file(&path) {
                warn!(
                    "event=backup_clear module=backup status=warn path={} error={}",
                    path.display(),
                    err
                );
            }
        }
        info!("event=backup_clear module=backup status=ok removed={removed}");
        Ok(removed)
    }

    fn existing_archive_path(&self, id: &str) -> BackupResult<PathBuf> {
        let path = archive_path(&self.dir, resolve_id(id)?);
        if !path.is_file() {
            return Err(BackupError::NotFound(id.to_string()));
        }
        Ok(path)
    }

    fn archive_paths(&self) -> BackupResult<Vec<PathBuf>> {
        Ok(self
            .dir_entries()?
            .into_iter()
            .filter(|path| path.is_file() && archive_id(path).is_some())
            .collect())
    }

    fn dir_entries(&self) -> BackupResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| BackupError::io(&self.dir, err))?;
        entries
            .map(|entry| {
                entry
                    .map(|entry| entry.path())
                    .map_err(|err| BackupError::io(&self.dir, err))
            })
            .collect()
    }
}

/// Wall-clock millis, bumped past the previous backup when the clock has not
/// advanced.
fn next_backup_timestamp() -> i64 {
    let now = epoch_millis_now();
    let previous = LAST_BACKUP_AT
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or_else(|last| last);
    now.max(previous.saturating_add(1))
}

fn resolve_id(id: &str) -> BackupResult<BackupId> {
    BackupId::parse_str(id.trim()).map_err(|_| BackupError::NotFound(id.to_string()))
}
