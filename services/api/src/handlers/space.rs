use axum::extract::State;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linetime_auth_types::identity::CurrentUser;
use linetime_core::response::ApiResponse;
use linetime_core::serde::to_rfc3339_ms;

use crate::domain::types::{MemberProfile, Space};
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;
use crate::usecase::space::{
    CreateSpaceInput, CreateSpaceUseCase, GetSpaceUseCase, JoinSpaceUseCase, ListMembersUseCase,
    ListSpacesUseCase, RefreshInviteUseCase, RemoveMemberInput, RemoveMemberUseCase,
};

#[derive(Serialize)]
pub struct SpaceResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub invite_code: String,
    pub invite_link: String,
    pub owner_id: Uuid,
    #[serde(rename = "type")]
    pub space_type: &'static str,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<Space> for SpaceResponse {
    fn from(space: Space) -> Self {
        Self {
            id: space.id,
            name: space.name,
            description: space.description,
            invite_code: space.invite_code,
            invite_link: space.invite_link,
            owner_id: space.owner_id,
            space_type: space.space_type.as_str(),
            created_at: space.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: &'static str,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub joined_at: DateTime<Utc>,
}

impl From<MemberProfile> for MemberResponse {
    fn from(member: MemberProfile) -> Self {
        Self {
            user_id: member.user_id,
            username: member.username,
            email: member.email,
            avatar: member.avatar_url,
            role: member.role.as_str(),
            joined_at: member.joined_at,
        }
    }
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub invite_code: String,
    pub invite_link: String,
}

// ── POST /api/spaces ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateSpaceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub space_type: Option<String>,
}

pub async fn create_space(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<CreateSpaceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = CreateSpaceUseCase {
        spaces: state.space_repo(),
        invite_base_url: state.invite_base_url.clone(),
    };
    let space = usecase
        .execute(CreateSpaceInput {
            owner_id: current.user_id,
            name: body.name,
            description: body.description,
            space_type: body.space_type,
        })
        .await?;
    Ok(ApiResponse::ok(SpaceResponse::from(space)))
}

// ── GET /api/spaces ───────────────────────────────────────────────────────────

pub async fn list_spaces(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = ListSpacesUseCase {
        spaces: state.space_repo(),
    };
    let spaces = usecase.execute(current.user_id).await?;
    let body: Vec<SpaceResponse> = spaces.into_iter().map(SpaceResponse::from).collect();
    Ok(ApiResponse::ok(body))
}

// ── GET /api/spaces/{id} ──────────────────────────────────────────────────────

pub async fn get_space(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(space_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = GetSpaceUseCase {
        spaces: state.space_repo(),
    };
    let space = usecase.execute(current.user_id, space_id).await?;
    Ok(ApiResponse::ok(SpaceResponse::from(space)))
}

// ── POST /api/spaces/{id}/invite ──────────────────────────────────────────────

pub async fn refresh_invite(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(space_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = RefreshInviteUseCase {
        spaces: state.space_repo(),
        invite_base_url: state.invite_base_url.clone(),
    };
    let space = usecase.execute(current.user_id, space_id).await?;
    Ok(ApiResponse::ok(InviteResponse {
        invite_code: space.invite_code,
        invite_link: space.invite_link,
    }))
}

// ── POST /api/spaces/join/{code} ──────────────────────────────────────────────

pub async fn join_space(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(code): AppPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = JoinSpaceUseCase {
        spaces: state.space_repo(),
    };
    let space = usecase.execute(current.user_id, &code).await?;
    Ok(ApiResponse::ok(SpaceResponse::from(space)))
}

// ── GET /api/spaces/{id}/members ──────────────────────────────────────────────

pub async fn list_members(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(space_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = ListMembersUseCase {
        spaces: state.space_repo(),
    };
    let members = usecase.execute(current.user_id, space_id).await?;
    let body: Vec<MemberResponse> = members.into_iter().map(MemberResponse::from).collect();
    Ok(ApiResponse::ok(body))
}

// ── DELETE /api/spaces/{id}/members/{user_id} ─────────────────────────────────

pub async fn remove_member(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath((space_id, member_id)): AppPath<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = RemoveMemberUseCase {
        spaces: state.space_repo(),
        users: state.user_repo(),
    };
    usecase
        .execute(RemoveMemberInput {
            caller_id: current.user_id,
            space_id,
            member_id,
        })
        .await?;
    Ok(ApiResponse::message("移除成员成功"))
}
