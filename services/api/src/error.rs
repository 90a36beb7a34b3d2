use axum::response::{IntoResponse, Response};

use linetime_core::response::ApiResponse;

/// API error variants. Every variant renders as the `{code, message, data}`
/// envelope with HTTP 200; `code()` carries the outcome.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("用户名或密码错误")]
    WrongCredentials,
    #[error("{0}")]
    Unauthorized(String),
    #[error("无效的令牌")]
    InvalidToken,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("请求过于频繁，请 {retry_after_secs} 秒后重试")]
    RateLimited { retry_after_secs: u64 },
    #[error("验证码已过期，请重新获取")]
    Expired,
    #[error("验证码无效")]
    InvalidCode,
    #[error("尝试次数过多，请重新获取验证码")]
    TooManyAttempts,
    #[error("验证码错误")]
    CodeMismatch,
    #[error("验证码发送失败，请稍后重试")]
    Delivery(#[source] anyhow::Error),
    #[error("服务器内部错误")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Envelope `code` for this outcome.
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::WrongCredentials | Self::Unauthorized(_) | Self::InvalidToken => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Expired | Self::InvalidCode | Self::TooManyAttempts | Self::CodeMismatch => 422,
            Self::RateLimited { .. } => 429,
            Self::Delivery(_) | Self::Internal(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::WrongCredentials => "WRONG_CREDENTIALS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Expired => "EXPIRED",
            Self::InvalidCode => "INVALID_CODE",
            Self::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            Self::CodeMismatch => "CODE_MISMATCH",
            Self::Delivery(_) => "DELIVERY",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // TraceLayer records every request; only server-side failures need the cause chain.
        if let Self::Internal(e) | Self::Delivery(e) = &self {
            let cause = format!("{e:#}");
            tracing::error!(error = %cause, kind = self.kind(), "internal error");
        }
        ApiResponse::failure(self.code(), self.to_string()).into_response()
    }
}
