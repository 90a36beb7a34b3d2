//! Bearer-token identity extractor.

use axum::extract::{FromRef, FromRequestParts};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use http::request::Parts;
use uuid::Uuid;

use linetime_core::response::ApiResponse;

use crate::token::{AuthError, validate_access_token};

/// HMAC secret used to verify access tokens. Services expose it through `FromRef`.
#[derive(Debug, Clone)]
pub struct AccessTokenSecret(pub String);

/// Authenticated caller resolved from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Rejection for [`CurrentUser`]. Rendered as the envelope with code 401.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

impl AuthRejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingToken => "未提供认证令牌",
            Self::InvalidToken => "无效的认证令牌",
            Self::ExpiredToken => "认证令牌已过期",
        }
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Expired => Self::ExpiredToken,
            AuthError::InvalidSignature | AuthError::Malformed => Self::InvalidToken,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        ApiResponse::failure(401, self.message()).into_response()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AccessTokenSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    // axum-core 0.5 defines this as `fn -> impl Future + Send`. Resolve everything
    // synchronously and hand back a 'static async block.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = AccessTokenSecret::from_ref(state);
        let result = match parts.headers.typed_get::<Authorization<Bearer>>() {
            None => Err(AuthRejection::MissingToken),
            Some(Authorization(bearer)) => validate_access_token(bearer.token(), &secret.0)
                .map(|info| Self {
                    user_id: info.user_id,
                    username: info.username,
                })
                .map_err(AuthRejection::from),
        };

        async move { result }
    }
}
