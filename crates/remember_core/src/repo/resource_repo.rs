//! Resource repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed CRUD over `resources`, unique by `(context, kind, key)`.
//! - Capture and replace the full table for backup/restore.
//!
//! # Invariants
//! - Upsert bumps `version` by exactly one and never touches `created_at`.
//! - Listings are ordered by `key ASC` (then `kind ASC`).
//! - `replace_all_resources` is all-or-nothing.

use crate::db::DbError;
use crate::error::ErrorKind;
use crate::model::resource::{
    Resource, ResourceDraft, ResourceHeader, ResourceKind, ResourceValidationError, Severity,
    DEFAULT_CONTEXT,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const RESOURCE_COLUMNS: &str = "context,
    kind,
    key,
    content,
    mime_type,
    severity,
    version,
    created_at,
    updated_at";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for resource persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(ResourceValidationError),
    Db(DbError),
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Db(_) | Self::InvalidData(_) => ErrorKind::Storage,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted resource data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ResourceValidationError> for RepoError {
    fn from(value: ResourceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter for listing resources of one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceListQuery {
    pub context: String,
    pub kind: Option<ResourceKind>,
}

impl ResourceListQuery {
    pub fn new(context: impl Into<String>, kind: Option<ResourceKind>) -> Self {
        Self {
            context: context.into(),
            kind,
        }
    }
}

/// Repository interface for keyed resource operations.
pub trait ResourceRepository {
    fn get_resource(&self, context: &str, kind: ResourceKind, key: &str)
        -> RepoResult<Option<Resource>>;
    /// Inserts or overwrites the draft's triple, stamping `now_ms`.
    fn upsert_resource(&self, draft: &ResourceDraft, now_ms: i64) -> RepoResult<Resource>;
    fn delete_resource(&self, context: &str, kind: ResourceKind, key: &str) -> RepoResult<bool>;
    fn list_resources(&self, query: &ResourceListQuery) -> RepoResult<Vec<Resource>>;
    fn list_headers(&self, context: &str, kind: ResourceKind) -> RepoResult<Vec<ResourceHeader>>;
    /// Distinct contexts, ascending, always including the default context.
    fn list_contexts(&self) -> RepoResult<Vec<String>>;
    fn count_resources(&self) -> RepoResult<usize>;
    /// Every resource ordered by `(context, kind, key)`.
    fn all_resources(&self) -> RepoResult<Vec<Resource>>;
}

/// SQLite-backed resource repository.
pub struct SqliteResourceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResourceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ResourceRepository for SqliteResourceRepository<'_> {
    fn get_resource(
        &self,
        context: &str,
        kind: ResourceKind,
        key: &str,
    ) -> RepoResult<Option<Resource>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESOURCE_COLUMNS}
             FROM resources
             WHERE context = ?1 AND kind = ?2 AND key = ?3;"
        ))?;
        let mut rows = stmt.query(params![context, kind.as_str(), key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_resource_row(row)?));
        }
        Ok(None)
    }

    fn upsert_resource(&self, draft: &ResourceDraft, now_ms: i64) -> RepoResult<Resource> {
        draft.validate()?;

        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO resources (
                context,
                kind,
                key,
                content,
                mime_type,
                severity,
                version,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
            ON CONFLICT (context, kind, key) DO UPDATE SET
                content = excluded.content,
                mime_type = excluded.mime_type,
                severity = excluded.severity,
                version = resources.version + 1,
                updated_at = excluded.updated_at
            RETURNING {RESOURCE_COLUMNS};"
        ))?;
        let resource = stmt.query_row(
            params![
                draft.context.as_str(),
                draft.kind.as_str(),
                draft.key.as_str(),
                draft.stored_content(),
                draft.mime_type.as_str(),
                draft.severity.map(Severity::as_str),
                now_ms,
            ],
            |row| Ok(parse_resource_row(row)),
        )??;
        Ok(resource)
    }

    fn delete_resource(&self, context: &str, kind: ResourceKind, key: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM resources WHERE context = ?1 AND kind = ?2 AND key = ?3;",
            params![context, kind.as_str(), key],
        )?;
        Ok(changed > 0)
    }

    fn list_resources(&self, query: &ResourceListQuery) -> RepoResult<Vec<Resource>> {
        let mut sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE context = ?");
        let mut bind_values = vec![Value::Text(query.context.clone())];

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        sql.push_str(" ORDER BY key ASC, kind ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut resources = Vec::new();
        while let Some(row) = rows.next()? {
            resources.push(parse_resource_row(row)?);
        }
        Ok(resources)
    }

    fn list_headers(&self, context: &str, kind: ResourceKind) -> RepoResult<Vec<ResourceHeader>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, mime_type, severity, version, updated_at
             FROM resources
             WHERE context = ?1 AND kind = ?2
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query(params![context, kind.as_str()])?;
        let mut headers = Vec::new();
        while let Some(row) = rows.next()? {
            headers.push(ResourceHeader {
                key: row.get("key")?,
                mime_type: row.get("mime_type")?,
                severity: parse_optional_severity(row)?,
                version: row.get("version")?,
                updated_at: row.get("updated_at")?,
            });
        }
        Ok(headers)
    }

    fn list_contexts(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT ?1 AS context
             UNION
             SELECT DISTINCT context FROM resources
             ORDER BY context ASC;",
        )?;
        let contexts = stmt
            .query_map([DEFAULT_CONTEXT], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contexts)
    }

    fn count_resources(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM resources;", [], |row| row.get(0))?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative resource count `{count}`")))
    }

    fn all_resources(&self) -> RepoResult<Vec<Resource>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESOURCE_COLUMNS}
             FROM resources
             ORDER BY context ASC, kind ASC, key ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut resources = Vec::new();
        while let Some(row) = rows.next()? {
            resources.push(parse_resource_row(row)?);
        }
        Ok(resources)
    }
}

/// Replaces the whole `resources` table with `resources` in one transaction.
///
/// Field values (version, timestamps) are written verbatim. Any invalid
/// record or SQL failure rolls the transaction back and leaves the previous
/// table intact.
pub fn replace_all_resources(conn: &mut Connection, resources: &[Resource]) -> RepoResult<usize> {
    for resource in resources {
        resource.validate()?;
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM resources;", [])?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO resources (
                context,
                kind,
                key,
                content,
                mime_type,
                severity,
                version,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        )?;
        for resource in resources {
            insert.execute(params![
                resource.context.as_str(),
                resource.kind.as_str(),
                resource.key.as_str(),
                resource.content.as_str(),
                resource.mime_type.as_str(),
                resource.severity.map(Severity::as_str),
                resource.version,
                resource.created_at,
                resource.updated_at,
            ])?;
        }
    }
    tx.commit()?;

    Ok(resources.len())
}

fn parse_resource_row(row: &Row<'_>) -> RepoResult<Resource> {
    let kind_text: String = row.get("kind")?;
    let kind = ResourceKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid kind `{kind_text}` in resources.kind"))
    })?;

    let resource = Resource {
        context: row.get("context")?,
        kind,
        key: row.get("key")?,
        content: row.get("content")?,
        mime_type: row.get("mime_type")?,
        severity: parse_optional_severity(row)?,
        version: row.get("version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    resource.validate().map_err(|err| {
        RepoError::InvalidData(format!(
            "resource {}/{}/{}: {err}",
            resource.context, resource.kind, resource.key
        ))
    })?;
    Ok(resource)
}

fn parse_optional_severity(row: &Row<'_>) -> RepoResult<Option<Severity>> {
    match row.get::<_, Option<String>>("severity")? {
        Some(value) => Severity::parse(&value).map(Some).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid severity `{value}` in resources.severity"))
        }),
        None => Ok(None),
    }
}
