//! Repository layer over the SQLite `resources` table.
//!
//! # Responsibility
//! - Keep SQL details inside the persistence boundary.
//! - Return semantic errors in addition to DB transport errors.
//!
//! # Invariants
//! - Write paths validate drafts before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod resource_repo;
