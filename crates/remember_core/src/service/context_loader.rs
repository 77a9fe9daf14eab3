//! Merged context view over the default context plus caller extras.
//!
//! # Responsibility
//! - Build the effective context list (`"me"` first, caller order kept).
//! - Concatenate per-context listings for every resource kind.
//!
//! # Invariants
//! - `"me"` appears exactly once, always first.
//! - No deduplication across contexts: equal keys in two contexts yield two
//!   entries.
//! - The whole load reads one consistent table state.

use crate::model::resource::{Resource, ResourceKind, DEFAULT_CONTEXT};
use crate::repo::resource_repo::{RepoResult, ResourceListQuery, ResourceRepository};
use crate::store::ResourceStore;
use log::debug;
use serde::Serialize;

/// Merged rules, snippets and summaries in context order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextView {
    /// Contexts that contributed, in merge order.
    pub contexts: Vec<String>,
    pub rules: Vec<Resource>,
    pub snippets: Vec<Resource>,
    pub summaries: Vec<Resource>,
}

impl ContextView {
    /// Rules rendered as `POLICY: text` lines.
    pub fn rule_lines(&self) -> Vec<String> {
        self.rules.iter().filter_map(Resource::rule_line).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.snippets.is_empty() && self.summaries.is_empty()
    }

    fn bucket_mut(&mut self, kind: ResourceKind) -> &mut Vec<Resource> {
        match kind {
            ResourceKind::Rule => &mut self.rules,
            ResourceKind::Snippet => &mut self.snippets,
            ResourceKind::Summary => &mut self.summaries,
        }
    }
}

/// Read-side loader for merged context views.
pub struct ContextLoader<'store> {
    store: &'store ResourceStore,
}

impl<'store> ContextLoader<'store> {
    pub fn new(store: &'store ResourceStore) -> Self {
        Self { store }
    }

    /// Loads `"me"` plus `extra_contexts`, in that order.
    pub fn load<S: AsRef<str>>(&self, extra_contexts: &[S]) -> RepoResult<ContextView> {
        let contexts = effective_contexts(extra_contexts);
        let view = self.store.with_repo(|repo| {
            let mut view = ContextView {
                contexts: contexts.clone(),
                ..ContextView::default()
            };
            for kind in ResourceKind::ALL {
                for context in &contexts {
                    let query = ResourceListQuery::new(context.as_str(), Some(kind));
                    let items = repo.list_resources(&query)?;
                    view.bucket_mut(kind).extend(items);
                }
            }
            Ok(view)
        })?;

        debug!(
            "event=context_load module=service status=ok contexts={} rules={} snippets={} summaries={}",
            view.contexts.len(),
            view.rules.len(),
            view.snippets.len(),
            view.summaries.len()
        );
        Ok(view)
    }
}

/// Returns `["me"] ++ extra_contexts` with blanks and repeats dropped.
///
/// A repeated context keeps its first position.
pub fn effective_contexts<S: AsRef<str>>(extra_contexts: &[S]) -> Vec<String> {
    let mut contexts = vec![DEFAULT_CONTEXT.to_string()];
    for extra in extra_contexts {
        let extra = extra.as_ref().trim();
        if extra.is_empty() || contexts.iter().any(|known| known == extra) {
            continue;
        }
        contexts.push(extra.to_string());
    }
    contexts
}
