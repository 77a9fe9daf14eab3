//! Kind-specific resource use-cases.
//!
//! # Responsibility
//! - Provide `rule.*`, `snippet.*` and `summary.*` entry points.
//! - Route rule writes through the rule validator before the store.
//!
//! # Invariants
//! - Service APIs never bypass store validation.
//! - Rules always reach the store with trimmed text and a typed severity.

use crate::model::resource::{Resource, ResourceDraft, ResourceHeader, ResourceKind};
use crate::repo::resource_repo::RepoResult;
use crate::service::rule_validator::{parse_rule_line, validate_rule, ValidatedRule};
use crate::store::ResourceStore;

/// Use-case facade over a shared [`ResourceStore`].
pub struct ResourceService<'store> {
    store: &'store ResourceStore,
}

impl<'store> ResourceService<'store> {
    pub fn new(store: &'store ResourceStore) -> Self {
        Self { store }
    }

    /// Sets a rule from a raw severity string and rule text.
    pub fn set_rule(
        &self,
        context: &str,
        key: &str,
        severity: &str,
        text: &str,
    ) -> RepoResult<Resource> {
        let rule = validate_rule(severity, text)?;
        self.store.set(&rule_draft(context, key, rule))
    }

    /// Sets a rule from its combined `POLICY: text` rendering.
    pub fn set_rule_line(&self, context: &str, key: &str, line: &str) -> RepoResult<Resource> {
        let rule = parse_rule_line(line)?;
        self.store.set(&rule_draft(context, key, rule))
    }

    /// Sets a snippet; `None` mime type means `text/plain`.
    pub fn set_snippet(
        &self,
        context: &str,
        key: &str,
        content: &str,
        mime_type: Option<&str>,
    ) -> RepoResult<Resource> {
        self.set_plain(ResourceKind::Snippet, context, key, content, mime_type)
    }

    /// Sets a summary; `None` mime type means `text/markdown`.
    pub fn set_summary(
        &self,
        context: &str,
        key: &str,
        content: &str,
        mime_type: Option<&str>,
    ) -> RepoResult<Resource> {
        self.set_plain(ResourceKind::Summary, context, key, content, mime_type)
    }

    pub fn get(&self, kind: ResourceKind, context: &str, key: &str) -> RepoResult<Option<Resource>> {
        self.store.get(context, kind, key)
    }

    pub fn list(&self, kind: ResourceKind, context: &str) -> RepoResult<Vec<Resource>> {
        self.store.list(context, Some(kind))
    }

    /// Lists keys and metadata without content.
    pub fn list_headers(&self, kind: ResourceKind, context: &str) -> RepoResult<Vec<ResourceHeader>> {
        self.store.list_headers(context, kind)
    }

    pub fn remove(&self, kind: ResourceKind, context: &str, key: &str) -> RepoResult<bool> {
        self.store.remove(context, kind, key)
    }

    fn set_plain(
        &self,
        kind: ResourceKind,
        context: &str,
        key: &str,
        content: &str,
        mime_type: Option<&str>,
    ) -> RepoResult<Resource> {
        let mut draft = ResourceDraft::new(context, kind, key, content);
        if let Some(mime_type) = mime_type {
            draft = draft.with_mime_type(mime_type);
        }
        self.store.set(&draft)
    }
}

fn rule_draft(context: &str, key: &str, rule: ValidatedRule) -> ResourceDraft {
    ResourceDraft::new(context, ResourceKind::Rule, key, rule.text).with_severity(rule.severity)
}
