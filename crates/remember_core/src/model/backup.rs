//! Backup metadata model.
//!
//! # Invariants
//! - A backup is immutable after creation.
//! - `id` is a UUID v4 and doubles as the archive file stem.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BackupId = Uuid;

/// Catalog entry describing one snapshot of the resource table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub id: BackupId,
    /// Optional caller label, trimmed; never blank.
    pub label: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Number of resources captured in the payload.
    pub resource_count: usize,
}

impl Backup {
    pub(crate) fn new(label: Option<&str>, created_at: i64, resource_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            created_at,
            resource_count,
        }
    }
}
