//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod context_loader;
pub mod resource_service;
pub mod rule_validator;
