use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use linetime_auth_types::token::{JwtClaims, validate_token};

use crate::domain::repository::UserRepository;
use crate::domain::types::User;
use crate::error::ApiError;

/// Signing secret plus the two token lifetimes.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Sign an HS256 token for `user` valid for `ttl_secs`. Returns the token and its `exp`.
pub fn issue_token(user: &User, secret: &str, ttl_secs: u64) -> Result<(String, u64), ApiError> {
    let iat = now_secs();
    let exp = iat + ttl_secs;
    let claims = JwtClaims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        iat,
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))?;
    Ok((token, exp))
}

pub fn issue_token_pair(user: &User, settings: &TokenSettings) -> Result<TokenPair, ApiError> {
    let (access_token, _) = issue_token(user, &settings.secret, settings.access_ttl_secs)?;
    let (refresh_token, _) = issue_token(user, &settings.secret, settings.refresh_ttl_secs)?;
    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: settings.access_ttl_secs,
    })
}

// ── RefreshToken ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RefreshTokenOutput {
    pub user: User,
    pub tokens: TokenPair,
}

pub struct RefreshTokenUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: TokenSettings,
}

impl<U: UserRepository> RefreshTokenUseCase<U> {
    pub async fn execute(&self, refresh_token: &str) -> Result<RefreshTokenOutput, ApiError> {
        let claims = validate_token(refresh_token, &self.tokens.secret)
            .map_err(|_| ApiError::InvalidToken)?;

        let user_id = claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| ApiError::InvalidToken)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        let tokens = issue_token_pair(&user, &self.tokens)?;
        Ok(RefreshTokenOutput { user, tokens })
    }
}
