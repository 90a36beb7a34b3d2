//! Space and membership domain types.

use serde::{Deserialize, Serialize};

/// Kind of shared container.
///
/// Wire format: `"personal" | "couple" | "group"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceType {
    #[default]
    Personal,
    Couple,
    Group,
}

impl SpaceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Couple => "couple",
            Self::Group => "group",
        }
    }

    /// Parse a wire value. Returns `None` for unknown types.
    pub fn parse(v: &str) -> Option<Self> {
        match v {
            "personal" => Some(Self::Personal),
            "couple" => Some(Self::Couple),
            "group" => Some(Self::Group),
            _ => None,
        }
    }
}

/// Role of a user inside a space. Exactly one `Owner` per space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }

    /// Parse the storage value. Unknown values are treated as `Member`.
    pub fn parse(v: &str) -> Self {
        match v {
            "owner" => Self::Owner,
            _ => Self::Member,
        }
    }
}
