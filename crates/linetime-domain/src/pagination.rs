//! Offset pagination for list endpoints.

use serde::{Deserialize, Serialize};

/// Offset pagination parameters.
///
/// - `limit`: 1–100, default 50
/// - `offset`: ≥ 0, default 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPage {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    50
}

impl Default for OffsetPage {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl OffsetPage {
    /// Clamp `limit` to 1–100. A zero limit falls back to the default.
    pub fn clamped(self) -> Self {
        let limit = if self.limit == 0 {
            default_limit()
        } else {
            self.limit.min(100)
        };
        Self {
            limit,
            offset: self.offset,
        }
    }
}
