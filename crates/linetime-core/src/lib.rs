//! Cross-cutting building blocks shared by LineTime services.
//!
//! Response envelope, env-driven configuration, health handlers, request-id
//! middleware, tracing bootstrap and serde helpers.

pub mod config;
pub mod health;
pub mod middleware;
pub mod response;
pub mod serde;
pub mod tracing;
