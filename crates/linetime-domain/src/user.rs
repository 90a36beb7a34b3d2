//! User domain types.

use serde::{Deserialize, Serialize};

/// How an account was created / signs in.
///
/// Wire and storage format: `"local"` or `"google"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    #[default]
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
        }
    }

    /// Parse the storage value. Unknown values fall back to `Local`.
    pub fn parse(v: &str) -> Self {
        match v {
            "google" => Self::Google,
            _ => Self::Local,
        }
    }
}
