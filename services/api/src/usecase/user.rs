use uuid::Uuid;

use crate::domain::repository::{SpaceRepository, UserRepository};
use crate::domain::types::User;
use crate::error::ApiError;

async fn find_user<U: UserRepository>(users: &U, user_id: Uuid) -> Result<User, ApiError> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("用户不存在"))
}

// ── SetDefaultSpace ──────────────────────────────────────────────────────────

pub struct SetDefaultSpaceUseCase<U: UserRepository, S: SpaceRepository> {
    pub users: U,
    pub spaces: S,
}

impl<U: UserRepository, S: SpaceRepository> SetDefaultSpaceUseCase<U, S> {
    pub async fn execute(&self, user_id: Uuid, space_id: Uuid) -> Result<User, ApiError> {
        let mut user = find_user(&self.users, user_id).await?;

        if self.spaces.find_by_id(space_id).await?.is_none() {
            return Err(ApiError::not_found("空间不存在"));
        }
        if !self.spaces.is_member(space_id, user_id).await? {
            return Err(ApiError::forbidden("您不是该空间的成员"));
        }

        self.users.set_default_space(user_id, Some(space_id)).await?;
        user.default_space_id = Some(space_id);
        Ok(user)
    }
}

// ── ClearDefaultSpace ────────────────────────────────────────────────────────

pub struct ClearDefaultSpaceUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> ClearDefaultSpaceUseCase<U> {
    pub async fn execute(&self, user_id: Uuid) -> Result<User, ApiError> {
        let mut user = find_user(&self.users, user_id).await?;
        self.users.set_default_space(user_id, None).await?;
        user.default_space_id = None;
        Ok(user)
    }
}
