//! Mock auth helpers for handler tests.
//!
//! Signs a real HS256 access token for a chosen identity so requests pass the
//! `CurrentUser` extractor without going through login.

use std::time::{SystemTime, UNIX_EPOCH};

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use linetime_auth_types::token::JwtClaims;

/// Configurable identity injected into test requests.
pub struct MockAuth {
    pub user_id: Uuid,
    pub username: String,
}

impl MockAuth {
    pub fn new(user_id: Uuid, username: &str) -> Self {
        Self {
            user_id,
            username: username.to_owned(),
        }
    }

    /// Access token valid for one hour.
    pub fn token(&self, secret: &str) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = JwtClaims {
            sub: self.user_id.to_string(),
            username: self.username.clone(),
            iat: now,
            exp: now + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    /// `Authorization: Bearer <token>` header map.
    pub fn headers(&self, secret: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token(secret))).unwrap(),
        );
        map
    }
}
