use anyhow::Context as _;
use chrono::Utc;
use rand::RngExt;

use crate::domain::repository::{CodeStore, Mailer, UserRepository};
use crate::domain::types::{
    CodeFlow, MAX_VERIFY_ATTEMPTS, RATE_LIMIT_TTL_SECS, VERIFICATION_CODE_LEN, VerificationRecord,
};
use crate::domain::validation::{ensure_email_format, mask_email, normalize_email};
use crate::error::ApiError;

/// Uniform over 000000–999999 from the thread-local CSPRNG.
fn generate_code() -> String {
    let mut rng = rand::rng();
    format!(
        "{:0width$}",
        rng.random_range(0..1_000_000u32),
        width = VERIFICATION_CODE_LEN
    )
}

// ── IssueCode ────────────────────────────────────────────────────────────────

pub struct IssueCodeInput {
    pub email: String,
    pub flow: CodeFlow,
}

#[derive(Debug)]
pub struct IssueCodeOutput {
    pub masked_email: String,
    pub expires_in: u64,
}

pub struct IssueCodeUseCase<U, S, M>
where
    U: UserRepository,
    S: CodeStore,
    M: Mailer,
{
    pub users: U,
    pub store: S,
    pub mailer: M,
}

impl<U, S, M> IssueCodeUseCase<U, S, M>
where
    U: UserRepository,
    S: CodeStore,
    M: Mailer,
{
    pub async fn execute(&self, input: IssueCodeInput) -> Result<IssueCodeOutput, ApiError> {
        let flow = input.flow;
        let email = normalize_email(&input.email);
        ensure_email_format(&email)?;

        // 1. Live rate marker → 429 with its remaining lifetime
        let rate_key = flow.rate_key(&email);
        if let Some(retry_after_secs) = self.store.ttl(&rate_key).await? {
            return Err(ApiError::RateLimited {
                retry_after_secs: retry_after_secs.max(1),
            });
        }

        // 2. Both flows need an existing account
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::not_found("该邮箱未注册"))?;
        if flow == CodeFlow::PasswordReset && !user.has_password() {
            return Err(ApiError::validation(
                "该账户使用 Google 登录，请使用 Google 登录",
            ));
        }

        // 3. Persist a fresh record under the flow's TTL
        let now = Utc::now();
        let ttl = flow.ttl();
        let record = VerificationRecord {
            email: email.clone(),
            code: generate_code(),
            attempts: 0,
            created_at: now,
            expires_at: now + ttl,
        };
        let payload = serde_json::to_string(&record).context("encode verification record")?;
        let record_key = flow.record_key(&email);
        let ttl_secs = ttl.num_seconds() as u64;
        self.store.set_ex(&record_key, &payload, ttl_secs).await?;

        // 4. Rate marker is best-effort: a miss only weakens throttling
        if let Err(e) = self
            .store
            .set_ex(&rate_key, "1", RATE_LIMIT_TTL_SECS)
            .await
        {
            tracing::warn!(error = %e, flow = flow.prefix(), "failed to write rate marker");
        }

        // 5. Deliver; on failure drop the record so the user can retry cleanly
        if let Err(e) = self.mailer.send_code(&email, &record.code, flow).await {
            if let Err(cleanup) = self.store.delete(&record_key).await {
                tracing::warn!(
                    error = %cleanup,
                    flow = flow.prefix(),
                    "failed to delete undelivered verification record"
                );
            }
            return Err(e);
        }

        tracing::info!(
            flow = flow.prefix(),
            email = %mask_email(&email),
            "verification code issued"
        );
        Ok(IssueCodeOutput {
            masked_email: mask_email(&email),
            expires_in: ttl_secs,
        })
    }
}

// ── VerifyCode ───────────────────────────────────────────────────────────────

pub struct VerifyCodeInput {
    pub email: String,
    pub code: String,
    pub flow: CodeFlow,
}

pub struct VerifyCodeUseCase<S: CodeStore> {
    pub store: S,
}

impl<S: CodeStore> VerifyCodeUseCase<S> {
    /// Consume the record on success. Failed attempts keep the record's
    /// original deadline; the counter only resets when the record is deleted.
    ///
    /// Every write is conditioned on the payload that was read, so concurrent
    /// attempts on one record serialize: a lost race re-reads and re-checks.
    pub async fn execute(&self, input: VerifyCodeInput) -> Result<(), ApiError> {
        let email = normalize_email(&input.email);
        let key = input.flow.record_key(&email);

        loop {
            let raw = self.store.get(&key).await?.ok_or(ApiError::Expired)?;
            let mut record: VerificationRecord =
                serde_json::from_str(&raw).map_err(|_| ApiError::InvalidCode)?;

            if record.is_expired(Utc::now()) {
                self.store.compare_and_delete(&key, &raw).await?;
                return Err(ApiError::Expired);
            }
            if record.attempts >= MAX_VERIFY_ATTEMPTS {
                self.store.compare_and_delete(&key, &raw).await?;
                return Err(ApiError::TooManyAttempts);
            }

            if record.code != input.code {
                record.attempts += 1;
                let payload =
                    serde_json::to_string(&record).context("encode verification record")?;
                if self.store.compare_and_swap(&key, &raw, &payload).await? {
                    return Err(ApiError::CodeMismatch);
                }
                continue;
            }

            if self.store.compare_and_delete(&key, &raw).await? {
                return Ok(());
            }
        }
    }
}
