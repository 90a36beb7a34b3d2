use axum::extract::State;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linetime_auth_types::identity::CurrentUser;
use linetime_core::response::ApiResponse;
use linetime_core::serde::to_rfc3339_ms;

use crate::domain::types::{CodeFlow, User};
use crate::error::ApiError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::usecase::auth::{
    AuthOutput, GetMeUseCase, GoogleLoginUseCase, LoginInput, LoginUseCase, LoginWithCodeInput,
    LoginWithCodeUseCase, RegisterInput, RegisterUseCase,
};
use crate::usecase::password::{
    ChangePasswordInput, ChangePasswordUseCase, ResetPasswordInput, ResetPasswordUseCase,
    SetPasswordUseCase,
};
use crate::usecase::token::RefreshTokenUseCase;
use crate::usecase::verification::{IssueCodeInput, IssueCodeOutput, IssueCodeUseCase};

/// Public account view; the password hash and Google subject never leave the service.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub default_space_id: Option<Uuid>,
    pub auth_provider: &'static str,
    pub has_password: bool,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            has_password: user.has_password(),
            id: user.id,
            email: user.email,
            username: user.username,
            avatar_url: user.avatar_url,
            default_space_id: user.default_space_id,
            auth_provider: user.auth_provider.as_str(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<AuthOutput> for AuthResponse {
    fn from(output: AuthOutput) -> Self {
        Self {
            user: output.user.into(),
            access_token: output.tokens.access_token,
            refresh_token: output.tokens.refresh_token,
            expires_in: output.tokens.expires_in,
        }
    }
}

#[derive(Serialize)]
pub struct CodeSentResponse {
    pub message: &'static str,
    pub masked_email: String,
    pub expires_in: u64,
}

impl From<IssueCodeOutput> for CodeSentResponse {
    fn from(output: IssueCodeOutput) -> Self {
        Self {
            message: "验证码已发送",
            masked_email: output.masked_email,
            expires_in: output.expires_in,
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

async fn issue_code(
    state: &AppState,
    email: String,
    flow: CodeFlow,
) -> Result<IssueCodeOutput, ApiError> {
    let usecase = IssueCodeUseCase {
        users: state.user_repo(),
        store: state.code_store(),
        mailer: state.mailer.clone(),
    };
    usecase.execute(IssueCodeInput { email, flow }).await
}

// ── POST /api/auth/register ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = RegisterUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
    };
    let output = usecase
        .execute(RegisterInput {
            email: body.email,
            username: body.username,
            password: body.password,
        })
        .await?;
    Ok(ApiResponse::ok(AuthResponse::from(output)))
}

// ── POST /api/auth/login ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = LoginUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
    };
    let output = usecase
        .execute(LoginInput {
            account: body.username,
            password: body.password,
        })
        .await?;
    Ok(ApiResponse::ok(AuthResponse::from(output)))
}

// ── POST /api/auth/google ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

pub async fn google_login(
    State(state): State<AppState>,
    AppJson(body): AppJson<GoogleLoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = GoogleLoginUseCase {
        users: state.user_repo(),
        google: state.google.clone(),
        tokens: state.tokens.clone(),
    };
    let output = usecase.execute(&body.id_token).await?;
    Ok(ApiResponse::ok(AuthResponse::from(output)))
}

// ── POST /api/auth/refresh ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = RefreshTokenUseCase {
        users: state.user_repo(),
        tokens: state.tokens.clone(),
    };
    let output = usecase.execute(&body.refresh_token).await?;
    Ok(ApiResponse::ok(AuthResponse {
        user: output.user.into(),
        access_token: output.tokens.access_token,
        refresh_token: output.tokens.refresh_token,
        expires_in: output.tokens.expires_in,
    }))
}

// ── GET /api/auth/me ──────────────────────────────────────────────────────────

pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = GetMeUseCase {
        users: state.user_repo(),
    };
    let user = usecase.execute(current.user_id).await?;
    Ok(ApiResponse::ok(UserResponse::from(user)))
}

// ── POST /api/auth/send-login-code ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

pub async fn send_login_code(
    State(state): State<AppState>,
    AppJson(body): AppJson<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output = issue_code(&state, body.email, CodeFlow::LoginCode).await?;
    Ok(ApiResponse::ok(CodeSentResponse::from(output)))
}

// ── POST /api/auth/login-code ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginWithCodeRequest {
    pub email: String,
    pub code: String,
}

pub async fn login_with_code(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginWithCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = LoginWithCodeUseCase {
        users: state.user_repo(),
        verifier: state.code_verifier(),
        tokens: state.tokens.clone(),
    };
    let output = usecase
        .execute(LoginWithCodeInput {
            email: body.email,
            code: body.code,
        })
        .await?;
    Ok(ApiResponse::ok(AuthResponse::from(output)))
}

// ── POST /api/auth/forgot-password ────────────────────────────────────────────

pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(body): AppJson<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output = issue_code(&state, body.email, CodeFlow::PasswordReset).await?;
    Ok(ApiResponse::ok(CodeSentResponse::from(output)))
}

// ── POST /api/auth/reset-password ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(body): AppJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = ResetPasswordUseCase {
        users: state.user_repo(),
        verifier: state.code_verifier(),
    };
    usecase
        .execute(ResetPasswordInput {
            email: body.email,
            code: body.code,
            new_password: body.new_password,
        })
        .await?;
    Ok(ApiResponse::ok(MessageResponse {
        message: "密码重置成功",
    }))
}

// ── POST /api/auth/change-password ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = ChangePasswordUseCase {
        users: state.user_repo(),
        store: state.code_store(),
    };
    usecase
        .execute(ChangePasswordInput {
            user_id: current.user_id,
            old_password: body.old_password,
            new_password: body.new_password,
        })
        .await?;
    Ok(ApiResponse::ok(MessageResponse {
        message: "密码修改成功",
    }))
}

// ── POST /api/auth/set-password ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

pub async fn set_password(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(body): AppJson<SetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let usecase = SetPasswordUseCase {
        users: state.user_repo(),
    };
    usecase.execute(current.user_id, &body.password).await?;
    Ok(ApiResponse::ok(MessageResponse {
        message: "密码设置成功",
    }))
}
