//! Auth types shared across LineTime crates.
//!
//! Provides JWT claims and validation plus the `CurrentUser` bearer-token extractor.

pub mod identity;
pub mod token;
