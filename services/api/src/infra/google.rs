use std::time::Duration;

use anyhow::{Context as _, anyhow};
use serde::Deserialize;

use crate::domain::repository::GoogleVerifier;
use crate::domain::types::GoogleIdentity;
use crate::error::ApiError;

pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Validates Google ID tokens against the `tokeninfo` endpoint, which checks
/// signature and expiry; the audience is checked here.
#[derive(Clone)]
pub struct GoogleTokenVerifier {
    http: reqwest::Client,
    client_id: Option<String>,
    tokeninfo_url: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: Option<String>) -> anyhow::Result<Self> {
        Self::with_endpoint(client_id, GOOGLE_TOKENINFO_URL)
    }

    pub fn with_endpoint(client_id: Option<String>, tokeninfo_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build google http client")?;
        Ok(Self {
            http,
            client_id: client_id.filter(|id| !id.is_empty()),
            tokeninfo_url: tokeninfo_url.to_owned(),
        })
    }
}

/// `tokeninfo` encodes booleans as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseBool {
    Bool(bool),
    Str(String),
}

impl LooseBool {
    fn value(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Str(s) => s.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<LooseBool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

fn identity_from(info: TokenInfo, client_id: &str) -> Result<GoogleIdentity, ApiError> {
    if info.aud != client_id {
        return Err(ApiError::Unauthorized("Google 认证失败".into()));
    }
    if info.sub.is_empty() {
        return Err(ApiError::Unauthorized("无效的 ID Token：缺少 sub 字段".into()));
    }
    Ok(GoogleIdentity {
        subject: info.sub,
        email: info.email.unwrap_or_default(),
        email_verified: info.email_verified.is_some_and(|v| v.value()),
        name: info.name.filter(|n| !n.is_empty()),
        picture: info.picture.filter(|p| !p.is_empty()),
    })
}

impl GoogleVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, ApiError> {
        if id_token.trim().is_empty() {
            return Err(ApiError::validation("ID Token 不能为空"));
        }
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| ApiError::Internal(anyhow!("GOOGLE_CLIENT_ID is not configured")))?;

        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .context("google tokeninfo request")?;

        if response.status().is_client_error() {
            tracing::debug!(status = %response.status(), "google rejected id token");
            return Err(ApiError::Unauthorized("Google 认证失败".into()));
        }
        let info: TokenInfo = response
            .error_for_status()
            .context("google tokeninfo status")?
            .json()
            .await
            .context("decode google tokeninfo")?;

        identity_from(info, client_id)
    }
}
