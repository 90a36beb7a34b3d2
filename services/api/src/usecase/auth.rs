use chrono::Utc;
use rand::RngExt;
use uuid::Uuid;

use linetime_domain::user::AuthProvider;

use crate::domain::repository::{CodeStore, GoogleVerifier, UserRepository};
use crate::domain::types::{CodeFlow, User};
use crate::domain::validation::{
    USERNAME_MAX_CHARS, USERNAME_MIN_CHARS, ensure_email_format, ensure_password,
    ensure_registrable_email, ensure_username, normalize_email,
};
use crate::error::ApiError;
use crate::usecase::password::{hash_password, verify_password};
use crate::usecase::token::{TokenPair, TokenSettings, issue_token_pair};
use crate::usecase::verification::{VerifyCodeInput, VerifyCodeUseCase};

/// Result of every successful sign-in path.
#[derive(Debug)]
pub struct AuthOutput {
    pub user: User,
    pub tokens: TokenPair,
}

// ── Register ─────────────────────────────────────────────────────────────────

pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

pub struct RegisterUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: TokenSettings,
}

impl<U: UserRepository> RegisterUseCase<U> {
    pub async fn execute(&self, input: RegisterInput) -> Result<AuthOutput, ApiError> {
        let email = normalize_email(&input.email);
        let username = input.username.trim().to_owned();
        ensure_registrable_email(&email)?;
        ensure_username(&username)?;
        ensure_password(&input.password)?;

        // Fast-path checks for friendly messages; the unique indexes decide races.
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("邮箱已被注册"));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(ApiError::conflict("用户名已被使用"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email,
            username,
            password_hash: Some(hash_password(&input.password).await?),
            avatar_url: None,
            default_space_id: None,
            google_id: None,
            auth_provider: AuthProvider::Local,
            created_at: now,
            updated_at: now,
        };
        self.users.create(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");

        let tokens = issue_token_pair(&user, &self.tokens)?;
        Ok(AuthOutput { user, tokens })
    }
}

// ── Login (password) ─────────────────────────────────────────────────────────

pub struct LoginInput {
    /// Username or email.
    pub account: String,
    pub password: String,
}

pub struct LoginUseCase<U: UserRepository> {
    pub users: U,
    pub tokens: TokenSettings,
}

impl<U: UserRepository> LoginUseCase<U> {
    /// Every failure is `WrongCredentials` so callers cannot probe for accounts.
    pub async fn execute(&self, input: LoginInput) -> Result<AuthOutput, ApiError> {
        let account = input.account.trim();
        let user = match self.users.find_by_username(account).await? {
            Some(user) => user,
            None => self
                .users
                .find_by_email(&normalize_email(account))
                .await?
                .ok_or(ApiError::WrongCredentials)?,
        };

        let Some(hash) = user.password_hash.as_deref().filter(|h| !h.is_empty()) else {
            return Err(ApiError::WrongCredentials);
        };
        if !verify_password(&input.password, hash).await? {
            return Err(ApiError::WrongCredentials);
        }

        let tokens = issue_token_pair(&user, &self.tokens)?;
        Ok(AuthOutput { user, tokens })
    }
}

// ── Login (code) ─────────────────────────────────────────────────────────────

pub struct LoginWithCodeInput {
    pub email: String,
    pub code: String,
}

pub struct LoginWithCodeUseCase<U: UserRepository, S: CodeStore> {
    pub users: U,
    pub verifier: VerifyCodeUseCase<S>,
    pub tokens: TokenSettings,
}

impl<U: UserRepository, S: CodeStore> LoginWithCodeUseCase<U, S> {
    pub async fn execute(&self, input: LoginWithCodeInput) -> Result<AuthOutput, ApiError> {
        let email = normalize_email(&input.email);
        ensure_email_format(&email)?;

        self.verifier
            .execute(VerifyCodeInput {
                email: email.clone(),
                code: input.code,
                flow: CodeFlow::LoginCode,
            })
            .await?;

        // Same answer as password login when the account is gone.
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(ApiError::WrongCredentials)?;

        let tokens = issue_token_pair(&user, &self.tokens)?;
        Ok(AuthOutput { user, tokens })
    }
}

// ── Google login ─────────────────────────────────────────────────────────────

/// Longest base taken from the email prefix before suffixes are appended.
const GOOGLE_USERNAME_BASE_MAX: usize = 40;
const GOOGLE_USERNAME_SUFFIX_TRIES: usize = 10;

/// Email local part reduced to `[A-Za-z0-9_]`, padded with `user` when short.
pub fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut base: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(GOOGLE_USERNAME_BASE_MAX)
        .collect();
    if base.chars().count() < USERNAME_MIN_CHARS {
        base.push_str("user");
    }
    base
}

fn with_random_suffix(base: &str) -> String {
    let suffix = rand::rng().random_range(0..10_000u32);
    let mut candidate = format!("{base}{suffix:04}");
    candidate.truncate(USERNAME_MAX_CHARS);
    candidate
}

fn opaque_username() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("user_{}", &id[..8])
}

pub struct GoogleLoginUseCase<U: UserRepository, G: GoogleVerifier> {
    pub users: U,
    pub google: G,
    pub tokens: TokenSettings,
}

impl<U: UserRepository, G: GoogleVerifier> GoogleLoginUseCase<U, G> {
    pub async fn execute(&self, id_token: &str) -> Result<AuthOutput, ApiError> {
        let identity = self.google.verify(id_token).await?;
        if !identity.email_verified {
            return Err(ApiError::validation("请使用已验证的 Google 邮箱"));
        }
        let email = normalize_email(&identity.email);

        // 1. Known Google subject
        if let Some(user) = self.users.find_by_google_id(&identity.subject).await? {
            let tokens = issue_token_pair(&user, &self.tokens)?;
            return Ok(AuthOutput { user, tokens });
        }

        // 2. Existing local account with the same email → link it
        if let Some(mut user) = self.users.find_by_email(&email).await? {
            self.users.link_google(user.id, &identity.subject).await?;
            user.google_id = Some(identity.subject);
            user.auth_provider = AuthProvider::Google;
            tracing::info!(user_id = %user.id, "google account linked");
            let tokens = issue_token_pair(&user, &self.tokens)?;
            return Ok(AuthOutput { user, tokens });
        }

        // 3. New account
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username: self.pick_username(&email).await?,
            email,
            password_hash: None,
            avatar_url: identity.picture,
            default_space_id: None,
            google_id: Some(identity.subject),
            auth_provider: AuthProvider::Google,
            created_at: now,
            updated_at: now,
        };
        self.users.create(&user).await?;
        tracing::info!(user_id = %user.id, "user registered via google");

        let tokens = issue_token_pair(&user, &self.tokens)?;
        Ok(AuthOutput { user, tokens })
    }

    async fn pick_username(&self, email: &str) -> Result<String, ApiError> {
        let base = username_base(email);
        if self.users.find_by_username(&base).await?.is_none() {
            return Ok(base);
        }
        for _ in 0..GOOGLE_USERNAME_SUFFIX_TRIES {
            let candidate = with_random_suffix(&base);
            if self.users.find_by_username(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Ok(opaque_username())
    }
}

// ── Me ───────────────────────────────────────────────────────────────────────

pub struct GetMeUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> GetMeUseCase<U> {
    pub async fn execute(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("用户不存在"))
    }
}
