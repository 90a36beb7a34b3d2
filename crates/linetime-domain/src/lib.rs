//! Domain types shared across LineTime crates.
//!
//! Pure types with no framework dependencies. Stored as text columns; the
//! `as_str` / `parse` pairs are the wire and storage format.

pub mod pagination;
pub mod space;
pub mod user;
