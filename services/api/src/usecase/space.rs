use chrono::Utc;
use rand::RngExt;
use uuid::Uuid;

use linetime_domain::space::{MemberRole, SpaceType};

use crate::domain::repository::{SpaceRepository, UserRepository};
use crate::domain::types::{INVITE_CODE_CHARSET, INVITE_CODE_LEN, MemberProfile, Space, SpaceMember};
use crate::domain::validation::ensure_space_name;
use crate::error::ApiError;

/// Fresh codes retried on a unique-index collision.
const INVITE_CODE_ATTEMPTS: usize = 3;

pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_CODE_CHARSET[rng.random_range(0..INVITE_CODE_CHARSET.len())] as char)
        .collect()
}

pub fn invite_link(base_url: &str, code: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), code)
}

async fn find_space<S: SpaceRepository>(spaces: &S, space_id: Uuid) -> Result<Space, ApiError> {
    spaces
        .find_by_id(space_id)
        .await?
        .ok_or_else(|| ApiError::not_found("空间不存在"))
}

// ── CreateSpace ──────────────────────────────────────────────────────────────

pub struct CreateSpaceInput {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub space_type: Option<String>,
}

pub struct CreateSpaceUseCase<S: SpaceRepository> {
    pub spaces: S,
    pub invite_base_url: String,
}

impl<S: SpaceRepository> CreateSpaceUseCase<S> {
    pub async fn execute(&self, input: CreateSpaceInput) -> Result<Space, ApiError> {
        ensure_space_name(&input.name)?;
        let space_type = match input.space_type.as_deref().map(str::trim) {
            None | Some("") => SpaceType::default(),
            Some(raw) => {
                SpaceType::parse(raw).ok_or_else(|| ApiError::validation("无效的空间类型"))?
            }
        };

        let now = Utc::now();
        let space_id = Uuid::now_v7();
        let owner = SpaceMember {
            id: Uuid::now_v7(),
            space_id,
            user_id: input.owner_id,
            role: MemberRole::Owner,
            joined_at: now,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let invite_code = generate_invite_code();
            let space = Space {
                id: space_id,
                name: input.name.trim().to_owned(),
                description: input.description.clone().filter(|d| !d.trim().is_empty()),
                invite_link: invite_link(&self.invite_base_url, &invite_code),
                invite_code,
                owner_id: input.owner_id,
                space_type,
                created_at: now,
            };
            match self.spaces.create_with_owner(&space, &owner).await {
                Ok(()) => return Ok(space),
                Err(ApiError::Conflict(_)) if attempt < INVITE_CODE_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

// ── ListSpaces ───────────────────────────────────────────────────────────────

pub struct ListSpacesUseCase<S: SpaceRepository> {
    pub spaces: S,
}

impl<S: SpaceRepository> ListSpacesUseCase<S> {
    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<Space>, ApiError> {
        self.spaces.list_by_member(user_id).await
    }
}

// ── GetSpace ─────────────────────────────────────────────────────────────────

pub struct GetSpaceUseCase<S: SpaceRepository> {
    pub spaces: S,
}

impl<S: SpaceRepository> GetSpaceUseCase<S> {
    pub async fn execute(&self, user_id: Uuid, space_id: Uuid) -> Result<Space, ApiError> {
        let space = find_space(&self.spaces, space_id).await?;
        if !self.spaces.is_member(space_id, user_id).await? {
            return Err(ApiError::forbidden("无权访问该空间"));
        }
        Ok(space)
    }
}

// ── RefreshInvite ────────────────────────────────────────────────────────────

pub struct RefreshInviteUseCase<S: SpaceRepository> {
    pub spaces: S,
    pub invite_base_url: String,
}

impl<S: SpaceRepository> RefreshInviteUseCase<S> {
    pub async fn execute(&self, user_id: Uuid, space_id: Uuid) -> Result<Space, ApiError> {
        let mut space = find_space(&self.spaces, space_id).await?;
        if space.owner_id != user_id {
            return Err(ApiError::forbidden("只有空间创建者可以刷新邀请码"));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let code = generate_invite_code();
            let link = invite_link(&self.invite_base_url, &code);
            match self.spaces.update_invite(space_id, &code, &link).await {
                Ok(()) => {
                    space.invite_code = code;
                    space.invite_link = link;
                    return Ok(space);
                }
                Err(ApiError::Conflict(_)) if attempt < INVITE_CODE_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

// ── JoinSpace ────────────────────────────────────────────────────────────────

pub struct JoinSpaceUseCase<S: SpaceRepository> {
    pub spaces: S,
}

impl<S: SpaceRepository> JoinSpaceUseCase<S> {
    pub async fn execute(&self, user_id: Uuid, invite_code: &str) -> Result<Space, ApiError> {
        let code = invite_code.trim().to_ascii_uppercase();
        let space = self
            .spaces
            .find_by_invite_code(&code)
            .await?
            .ok_or_else(|| ApiError::not_found("邀请码无效"))?;

        if self.spaces.is_member(space.id, user_id).await? {
            return Err(ApiError::conflict("您已经在该空间中"));
        }

        let member = SpaceMember {
            id: Uuid::now_v7(),
            space_id: space.id,
            user_id,
            role: MemberRole::Member,
            joined_at: Utc::now(),
        };
        self.spaces.add_member(&member).await?;
        tracing::info!(space_id = %space.id, user_id = %user_id, "member joined space");
        Ok(space)
    }
}

// ── ListMembers ──────────────────────────────────────────────────────────────

pub struct ListMembersUseCase<S: SpaceRepository> {
    pub spaces: S,
}

impl<S: SpaceRepository> ListMembersUseCase<S> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        space_id: Uuid,
    ) -> Result<Vec<MemberProfile>, ApiError> {
        find_space(&self.spaces, space_id).await?;
        if !self.spaces.is_member(space_id, user_id).await? {
            return Err(ApiError::forbidden("无权访问该空间"));
        }
        self.spaces.list_members(space_id).await
    }
}

// ── RemoveMember ─────────────────────────────────────────────────────────────

pub struct RemoveMemberInput {
    pub caller_id: Uuid,
    pub space_id: Uuid,
    pub member_id: Uuid,
}

pub struct RemoveMemberUseCase<S: SpaceRepository, U: UserRepository> {
    pub spaces: S,
    pub users: U,
}

impl<S: SpaceRepository, U: UserRepository> RemoveMemberUseCase<S, U> {
    pub async fn execute(&self, input: RemoveMemberInput) -> Result<(), ApiError> {
        let space = find_space(&self.spaces, input.space_id).await?;
        if space.owner_id != input.caller_id {
            return Err(ApiError::forbidden("只有空间创建者可以移除成员"));
        }
        if input.member_id == input.caller_id {
            return Err(ApiError::validation("不能移除自己"));
        }

        if !self
            .spaces
            .remove_member(input.space_id, input.member_id)
            .await?
        {
            return Err(ApiError::not_found("该用户不在空间中"));
        }
        self.users
            .clear_default_space_if(input.member_id, input.space_id)
            .await?;
        tracing::info!(
            space_id = %input.space_id,
            user_id = %input.member_id,
            "member removed from space"
        );
        Ok(())
    }
}
