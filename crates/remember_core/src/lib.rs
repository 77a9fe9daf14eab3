//! Core storage for remember-me: rules, snippets and summaries grouped into
//! contexts, plus whole-store backup and restore.
//! This crate is the single source of truth for storage invariants.

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use backup::{BackupError, BackupManager, BackupResult, RestoreOptions, RestoreOutcome};
pub use config::StoreConfig;
pub use db::{DbError, DbResult};
pub use error::ErrorKind;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::backup::{Backup, BackupId};
pub use model::resource::{
    Resource, ResourceDraft, ResourceHeader, ResourceKind, ResourceValidationError, Severity,
    DEFAULT_CONTEXT,
};
pub use repo::resource_repo::{RepoError, RepoResult};
pub use service::context_loader::{ContextLoader, ContextView};
pub use service::resource_service::ResourceService;
pub use store::ResourceStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
