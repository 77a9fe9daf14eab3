//! Snapshot and restore of the whole resource table.
//!
//! # Responsibility
//! - Persist point-in-time copies of every resource as archive files.
//! - Restore an archive atomically over the live store.
//! - Maintain the backup catalog (list/remove/clear).
//!
//! # Invariants
//! - Archives are published with write-temp-then-rename; a failed create
//!   leaves no visible archive.
//! - Restore never modifies the catalog; catalog operations never modify
//!   live resources.

mod archive;
mod manager;

pub use archive::ARCHIVE_FORMAT_VERSION;
pub use manager::{BackupManager, RestoreOptions, RestoreOutcome};

use crate::error::ErrorKind;
use crate::repo::resource_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type BackupResult<T> = Result<T, BackupError>;

/// Backup catalog and restore errors.
#[derive(Debug)]
pub enum BackupError {
    /// No archive with this id exists.
    NotFound(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
    /// Archive exists but cannot be decoded or is inconsistent.
    InvalidArchive {
        path: PathBuf,
        message: String,
    },
    UnsupportedFormat {
        path: PathBuf,
        format_version: u32,
    },
    Store(RepoError),
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store(err) => err.kind(),
            Self::Io { .. }
            | Self::Serialize(_)
            | Self::InvalidArchive { .. }
            | Self::UnsupportedFormat { .. } => ErrorKind::Storage,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "backup does not exist: {id}"),
            Self::Io { path, source } => write!(f, "backup io error at `{}`: {source}", path.display()),
            Self::Serialize(err) => write!(f, "failed to encode backup archive: {err}"),
            Self::InvalidArchive { path, message } => {
                write!(f, "invalid backup archive `{}`: {message}", path.display())
            }
            Self::UnsupportedFormat {
                path,
                format_version,
            } => write!(
                f,
                "backup archive `{}` has format version {format_version}, newer than supported {}",
                path.display(),
                ARCHIVE_FORMAT_VERSION
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::InvalidArchive { .. } | Self::UnsupportedFormat { .. } => None,
        }
    }
}

impl From<RepoError> for BackupError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}
