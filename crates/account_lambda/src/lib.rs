//! AWS-oriented adapters and handlers for the account suspension command.
//!
//! This crate owns runtime integration details (the Lambda entry point and
//! the remote function-invocation seam). Domain contracts, the fallback
//! recomputation, and the resilience policy live in `account_core`.

pub mod adapters;
pub mod handlers;
