//! Durable resource store with store-wide locking.
//!
//! # Responsibility
//! - Own the single SQLite connection holding every resource.
//! - Expose keyed get/set/remove/list operations.
//! - Provide consistent capture and exclusive replacement for backups.
//!
//! # Invariants
//! - Every operation enters the `gate`: ordinary operations on the shared
//!   side, `replace_all` on the exclusive side for the whole swap.
//! - Statements execute under the connection mutex, so each write is an
//!   exclusive section and no reader sees a partial write.
//! - A poisoned lock is recovered; SQLite transactions keep the table
//!   consistent even if a holder panicked.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::epoch_millis_now;
use crate::model::resource::{Resource, ResourceDraft, ResourceHeader, ResourceKind};
use crate::repo::resource_repo::{
    replace_all_resources, RepoResult, ResourceListQuery, ResourceRepository,
    SqliteResourceRepository,
};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

/// Store of rules, snippets and summaries keyed by `(context, kind, key)`.
pub struct ResourceStore {
    gate: RwLock<()>,
    conn: Mutex<Connection>,
}

impl ResourceStore {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            gate: RwLock::new(()),
            conn: Mutex::new(conn),
        }
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    /// Returns the resource for the triple, or `None` when absent.
    pub fn get(&self, context: &str, kind: ResourceKind, key: &str) -> RepoResult<Option<Resource>> {
        self.with_repo(|repo| repo.get_resource(context, kind, key))
    }

    /// Upserts one resource.
    ///
    /// # Errors
    /// - `RepoError::Validation` for blank context/key, blank rule text or a
    ///   kind/severity mismatch; nothing is written.
    pub fn set(&self, draft: &ResourceDraft) -> RepoResult<Resource> {
        let started_at = Instant::now();
        let result = self.with_repo(|repo| repo.upsert_resource(draft, epoch_millis_now()));
        match &result {
            Ok(resource) => info!(
                "event=resource_set module=store status=ok kind={} version={} duration_ms={}",
                resource.kind,
                resource.version,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=resource_set module=store status=error kind={} error_kind={} error={}",
                draft.kind,
                err.kind(),
                err
            ),
        }
        result
    }

    /// Hard-deletes the triple; `true` when a record existed.
    pub fn remove(&self, context: &str, kind: ResourceKind, key: &str) -> RepoResult<bool> {
        let removed = self.with_repo(|repo| repo.delete_resource(context, kind, key))?;
        info!("event=resource_remove module=store status=ok kind={kind} removed={removed}");
        Ok(removed)
    }

    /// Lists one context, optionally filtered by kind, ascending by key.
    pub fn list(&self, context: &str, kind: Option<ResourceKind>) -> RepoResult<Vec<Resource>> {
        let query = ResourceListQuery::new(context, kind);
        self.with_repo(|repo| repo.list_resources(&query))
    }

    /// Lists one context/kind without content payloads.
    pub fn list_headers(&self, context: &str, kind: ResourceKind) -> RepoResult<Vec<ResourceHeader>> {
        self.with_repo(|repo| repo.list_headers(context, kind))
    }

    /// Known contexts, ascending; always contains `"me"`.
    pub fn contexts(&self) -> RepoResult<Vec<String>> {
        self.with_repo(|repo| repo.list_contexts())
    }

    pub fn count(&self) -> RepoResult<usize> {
        self.with_repo(|repo| repo.count_resources())
    }

    /// Captures every resource at a single point in time.
    pub fn snapshot(&self) -> RepoResult<Vec<Resource>> {
        self.with_repo(|repo| repo.all_resources())
    }

    /// Atomically swaps the whole table for `resources`.
    ///
    /// Holds the exclusive side of the gate, so no reader or writer runs
    /// until the transaction has committed or rolled back.
    pub fn replace_all(&self, resources: &[Resource]) -> RepoResult<usize> {
        let _exclusive = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        let mut conn = self.lock_conn();
        replace_all_resources(&mut conn, resources)
    }

    /// Runs `op` inside one shared section of the gate, holding the connection.
    ///
    /// Several repository calls made by `op` observe the same table state.
    pub fn with_repo<T>(
        &self,
        op: impl FnOnce(&SqliteResourceRepository<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let _shared = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        let conn = self.lock_conn();
        op(&SqliteResourceRepository::new(&conn))
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
