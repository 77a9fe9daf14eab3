//! Domain model for stored resources and backup metadata.
//!
//! # Responsibility
//! - Define the canonical record shared by rule/snippet/summary kinds.
//! - Define immutable backup metadata.
//!
//! # Invariants
//! - A resource is identified by its `(context, kind, key)` triple.
//! - Resource kinds form a closed set; dispatch is a `match`, never a trait.

pub mod backup;
pub mod resource;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub(crate) fn epoch_millis_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
