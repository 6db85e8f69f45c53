//! Shared account suspension domain primitives.
//!
//! This crate owns the command's deterministic behavior: account and event
//! contracts, the local fallback recomputation, and the fallback dispatch and
//! circuit breaker policy. It intentionally excludes AWS SDK and Lambda
//! runtime concerns.

pub mod contract;
pub mod fallback;
pub mod resilience;
