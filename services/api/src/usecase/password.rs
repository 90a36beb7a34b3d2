use anyhow::{Context as _, anyhow};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

use crate::domain::repository::{CodeStore, UserRepository};
use crate::domain::types::CodeFlow;
use crate::domain::validation::{ensure_password, normalize_email};
use crate::error::ApiError;
use crate::usecase::verification::{VerifyCodeInput, VerifyCodeUseCase};

/// Argon2id PHC string. Runs on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| anyhow!("hash password: {e}"))
    })
    .await
    .context("join password hasher")??;
    Ok(hash)
}

/// `false` for a wrong password or an unparsable stored hash.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let matches = tokio::task::spawn_blocking(move || {
        PasswordHash::new(&hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    })
    .await
    .context("join password verifier")?;
    Ok(matches)
}

// ── ResetPassword ────────────────────────────────────────────────────────────

pub struct ResetPasswordInput {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

pub struct ResetPasswordUseCase<U: UserRepository, S: CodeStore> {
    pub users: U,
    pub verifier: VerifyCodeUseCase<S>,
}

impl<U: UserRepository, S: CodeStore> ResetPasswordUseCase<U, S> {
    pub async fn execute(&self, input: ResetPasswordInput) -> Result<(), ApiError> {
        // Policy check first so a weak password does not burn an attempt.
        ensure_password(&input.new_password)?;
        let email = normalize_email(&input.email);

        self.verifier
            .execute(VerifyCodeInput {
                email: email.clone(),
                code: input.code,
                flow: CodeFlow::PasswordReset,
            })
            .await?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::not_found("该邮箱未注册"))?;

        let hash = hash_password(&input.new_password).await?;
        self.users.update_password(user.id, &hash).await?;
        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }
}

// ── ChangePassword ───────────────────────────────────────────────────────────

pub struct ChangePasswordInput {
    pub user_id: Uuid,
    pub old_password: String,
    pub new_password: String,
}

pub struct ChangePasswordUseCase<U: UserRepository, S: CodeStore> {
    pub users: U,
    pub store: S,
}

impl<U: UserRepository, S: CodeStore> ChangePasswordUseCase<U, S> {
    pub async fn execute(&self, input: ChangePasswordInput) -> Result<(), ApiError> {
        let user = self
            .users
            .find_by_id(input.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("用户不存在"))?;

        let Some(current_hash) = user.password_hash.as_deref().filter(|h| !h.is_empty()) else {
            return Err(ApiError::validation("您尚未设置密码，请先设置密码"));
        };
        if !verify_password(&input.old_password, current_hash).await? {
            return Err(ApiError::validation("当前密码错误"));
        }
        ensure_password(&input.new_password)?;

        let hash = hash_password(&input.new_password).await?;
        self.users.update_password(user.id, &hash).await?;

        // A pending reset code must not outlive a password change.
        let reset_key = CodeFlow::PasswordReset.record_key(&user.email);
        if let Err(e) = self.store.delete(&reset_key).await {
            tracing::warn!(error = %e, user_id = %user.id, "failed to clear pending reset code");
        }
        Ok(())
    }
}

// ── SetPassword ──────────────────────────────────────────────────────────────

pub struct SetPasswordUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> SetPasswordUseCase<U> {
    /// First password for an account created through Google.
    pub async fn execute(&self, user_id: Uuid, password: &str) -> Result<(), ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("用户不存在"))?;
        if user.has_password() {
            return Err(ApiError::validation("您已设置密码，请使用修改密码功能"));
        }
        ensure_password(password)?;

        let hash = hash_password(password).await?;
        self.users.update_password(user.id, &hash).await
    }
}
