use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linetime_auth_types::identity::CurrentUser;
use linetime_core::response::ApiResponse;

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::usecase::user::{ClearDefaultSpaceUseCase, SetDefaultSpaceUseCase};

#[derive(Serialize)]
pub struct DefaultSpaceResponse {
    pub default_space_id: Option<Uuid>,
}

// ── PUT /api/users/default-space ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SetDefaultSpaceRequest {
    pub space_id: Uuid,
}

pub async fn set_default_space(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<SetDefaultSpaceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = SetDefaultSpaceUseCase {
        users: state.user_repo(),
        spaces: state.space_repo(),
    };
    let user = usecase.execute(current.user_id, body.space_id).await?;
    Ok(ApiResponse::ok(DefaultSpaceResponse {
        default_space_id: user.default_space_id,
    }))
}

// ── DELETE /api/users/default-space ───────────────────────────────────────────

pub async fn clear_default_space(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = ClearDefaultSpaceUseCase {
        users: state.user_repo(),
    };
    let user = usecase.execute(current.user_id).await?;
    Ok(ApiResponse::ok(DefaultSpaceResponse {
        default_space_id: user.default_space_id,
    }))
}
