#![allow(async_fn_in_trait)]

use chrono::NaiveDate;
use uuid::Uuid;

use linetime_domain::pagination::OffsetPage;

use crate::domain::types::{
    CodeFlow, Event, EventImage, GoogleIdentity, MemberProfile, Space, SpaceMember, User,
};
use crate::error::ApiError;

/// Repository for accounts. Soft-deleted users are never returned.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, ApiError>;

    /// Insert a user. A unique-constraint violation surfaces as `Conflict`.
    async fn create(&self, user: &User) -> Result<(), ApiError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), ApiError>;

    /// Attach a Google subject to an existing account and mark it `google`.
    async fn link_google(&self, id: Uuid, google_id: &str) -> Result<(), ApiError>;

    async fn set_default_space(&self, id: Uuid, space_id: Option<Uuid>)
    -> Result<(), ApiError>;

    /// Clear `default_space_id` only when it currently points at `space_id`.
    async fn clear_default_space_if(&self, id: Uuid, space_id: Uuid) -> Result<(), ApiError>;
}

/// Repository for spaces and their memberships.
pub trait SpaceRepository: Send + Sync {
    /// Insert the space and its owner membership atomically (same transaction).
    async fn create_with_owner(&self, space: &Space, owner: &SpaceMember)
    -> Result<(), ApiError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Space>, ApiError>;
    async fn find_by_invite_code(&self, code: &str) -> Result<Option<Space>, ApiError>;

    /// Spaces the user belongs to, newest first.
    async fn list_by_member(&self, user_id: Uuid) -> Result<Vec<Space>, ApiError>;

    async fn update_invite(&self, id: Uuid, code: &str, link: &str) -> Result<(), ApiError>;

    async fn is_member(&self, space_id: Uuid, user_id: Uuid) -> Result<bool, ApiError>;

    /// Insert a membership. A duplicate `(space_id, user_id)` surfaces as `Conflict`.
    async fn add_member(&self, member: &SpaceMember) -> Result<(), ApiError>;

    /// Returns `true` if a membership was removed.
    async fn remove_member(&self, space_id: Uuid, user_id: Uuid) -> Result<bool, ApiError>;

    /// Members with profile data, owner first, then by join time.
    async fn list_members(&self, space_id: Uuid) -> Result<Vec<MemberProfile>, ApiError>;
}

/// Repository for events and their images. Soft-deleted rows are never returned.
pub trait EventRepository: Send + Sync {
    /// Insert the event and `event.images` atomically.
    async fn create(&self, event: &Event) -> Result<(), ApiError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, ApiError>;

    /// Newest first (`event_date DESC, event_time DESC`).
    async fn list_by_space(&self, space_id: Uuid, page: OffsetPage)
    -> Result<Vec<Event>, ApiError>;

    /// Inclusive date range, same ordering as [`Self::list_by_space`].
    async fn list_by_date_range(
        &self,
        space_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>, ApiError>;

    /// Persist scalar fields; when `replace_images` is set, soft-delete the
    /// current images and insert `event.images` in the same transaction.
    async fn update(&self, event: &Event, replace_images: bool) -> Result<(), ApiError>;

    async fn soft_delete(&self, id: Uuid) -> Result<(), ApiError>;

    async fn find_image(&self, image_id: Uuid) -> Result<Option<EventImage>, ApiError>;

    async fn soft_delete_image(&self, image_id: Uuid) -> Result<(), ApiError>;
}

/// Key-value store with per-key expiry (Redis in production).
pub trait CodeStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError>;
    async fn delete(&self, key: &str) -> Result<(), ApiError>;

    /// Replace the value only if it still equals `expected`, keeping the key's TTL.
    /// Returns `false` when the key changed or vanished since it was read.
    async fn compare_and_swap(&self, key: &str, expected: &str, value: &str)
    -> Result<bool, ApiError>;

    /// Delete the key only if it still equals `expected`.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, ApiError>;

    /// Remaining lifetime in seconds; `None` if the key is missing or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<u64>, ApiError>;
}

/// Outbound email for one-time codes.
pub trait Mailer: Send + Sync {
    async fn send_code(&self, to: &str, code: &str, flow: CodeFlow) -> Result<(), ApiError>;
}

/// S3-compatible object storage.
pub trait ObjectStorage: Send + Sync {
    /// Store `body` under `key` and return its public URL.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str)
    -> Result<String, ApiError>;
}

/// Verifies Google ID tokens issued for this application.
pub trait GoogleVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, ApiError>;
}
