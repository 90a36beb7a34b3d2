use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linetime_domain::space::{MemberRole, SpaceType};
use linetime_domain::user::AuthProvider;

/// Account as seen by use cases.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub avatar_url: Option<String>,
    pub default_space_id: Option<Uuid>,
    pub google_id: Option<String>,
    pub auth_provider: AuthProvider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Google-only accounts have no local password until one is set.
    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub invite_code: String,
    pub invite_link: String,
    pub owner_id: Uuid,
    pub space_type: SpaceType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SpaceMember {
    pub id: Uuid,
    pub space_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Member row joined with the user's public profile.
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: Uuid,
    pub space_id: Uuid,
    pub user_id: Uuid,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub title: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered by `sort_order` ascending.
    pub images: Vec<EventImage>,
}

#[derive(Debug, Clone)]
pub struct EventImage {
    pub id: Uuid,
    pub event_id: Uuid,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub sort_order: i32,
    pub uploaded_at: DateTime<Utc>,
}

/// Image reference supplied by a client when creating or editing an event.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub image_url: String,
    pub thumbnail_url: Option<String>,
}

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Stored result of an image upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub image_url: String,
    pub thumbnail_url: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
}

// ── Verification codes ───────────────────────────────────────────────────────

/// Which one-time-code flow a record belongs to. Each flow has its own key
/// namespace, TTL and rate marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFlow {
    PasswordReset,
    LoginCode,
}

impl CodeFlow {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::PasswordReset => "password_reset",
            Self::LoginCode => "login_code",
        }
    }

    /// `<flow>:<email>`
    pub fn record_key(self, email: &str) -> String {
        format!("{}:{}", self.prefix(), email)
    }

    /// `<flow>_rate:<email>`
    pub fn rate_key(self, email: &str) -> String {
        format!("{}_rate:{}", self.prefix(), email)
    }

    pub fn ttl(self) -> Duration {
        match self {
            Self::PasswordReset => Duration::minutes(PASSWORD_RESET_TTL_MINUTES),
            Self::LoginCode => Duration::minutes(LOGIN_CODE_TTL_MINUTES),
        }
    }

    pub fn email_subject(self) -> &'static str {
        match self {
            Self::PasswordReset => "LineTime 密码重置验证码",
            Self::LoginCode => "LineTime 登录验证码",
        }
    }

    pub fn purpose(self) -> &'static str {
        match self {
            Self::PasswordReset => "重置密码",
            Self::LoginCode => "登录",
        }
    }
}

/// Payload stored under [`CodeFlow::record_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub email: String,
    pub code: String,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub const PASSWORD_RESET_TTL_MINUTES: i64 = 10;
pub const LOGIN_CODE_TTL_MINUTES: i64 = 5;

/// Failed verifications allowed before the record is discarded.
pub const MAX_VERIFY_ATTEMPTS: u32 = 5;

/// Lifetime of the per-email rate marker.
pub const RATE_LIMIT_TTL_SECS: u64 = 60;

pub const VERIFICATION_CODE_LEN: usize = 6;

// ── Spaces ───────────────────────────────────────────────────────────────────

pub const INVITE_CODE_LEN: usize = 8;

/// Charset for invite codes (uppercase alphanumeric).
pub const INVITE_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// ── Uploads ──────────────────────────────────────────────────────────────────

pub const THUMBNAIL_WIDTH: u32 = 400;
pub const THUMBNAIL_JPEG_QUALITY: u8 = 85;
