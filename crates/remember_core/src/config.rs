//! Store configuration.
//!
//! # Responsibility
//! - Name the database file, backup directory and logging settings.
//! - Resolve defaults and `REMEMBER_ME_*` environment overrides.
//!
//! # Invariants
//! - A leading `~` is expanded against the user's home directory.
//! - Blank environment values are ignored.

use crate::logging::default_log_level;
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "REMEMBER_ME_DB_PATH";
pub const ENV_BACKUP_DIR: &str = "REMEMBER_ME_BACKUP_DIR";
pub const ENV_LOG_LEVEL: &str = "REMEMBER_ME_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "REMEMBER_ME_LOG_DIR";

const DEFAULT_DB_PATH: &str = "~/.mcp/me/my.db";
const DEFAULT_BACKUP_DIR: &str = "~/.mcp/me/backups";
const DEFAULT_LOG_DIR: &str = "~/.mcp/me/logs";

/// Paths and logging settings for one store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: expand_home(DEFAULT_DB_PATH),
            backup_dir: expand_home(DEFAULT_BACKUP_DIR),
            log_level: default_log_level().to_string(),
            log_dir: expand_home(DEFAULT_LOG_DIR),
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(value) = non_blank(ENV_DB_PATH) {
            config.db_path = expand_home(value.trim());
        }
        if let Some(value) = non_blank(ENV_BACKUP_DIR) {
            config.backup_dir = expand_home(value.trim());
        }
        if let Some(value) = non_blank(ENV_LOG_LEVEL) {
            config.log_level = value.trim().to_string();
        }
        if let Some(value) = non_blank(ENV_LOG_DIR) {
            config.log_dir = expand_home(value.trim());
        }
        config
    }
}

/// Expands a leading `~` or `~/`; other paths are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => Path::new(path).to_path_buf(),
    }
}
