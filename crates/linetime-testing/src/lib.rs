//! Test utilities for LineTime services.
//!
//! Provides bearer-token `MockAuth` and envelope readers.
//! Import from dev-dependencies only, never in production code.

pub mod auth;
pub mod envelope;
