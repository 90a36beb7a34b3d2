use std::time::Instant;

use linetime_api::domain::repository::CodeStore;
use linetime_api::domain::types::{CodeFlow, VerificationRecord};
use linetime_api::error::ApiError;
use linetime_api::usecase::verification::{
    IssueCodeInput, IssueCodeUseCase, VerifyCodeInput, VerifyCodeUseCase,
};

use crate::helpers::{MemoryCodeStore, MockMailer, MockUserRepo, google_user, test_user};

const EMAIL: &str = "alice@qq.com";

/// Yields to the scheduler after every read so concurrent verifications interleave.
#[derive(Clone, Default)]
struct InterleavingStore(MemoryCodeStore);

impl CodeStore for InterleavingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        let value = self.0.get(key).await;
        tokio::task::yield_now().await;
        value
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError> {
        self.0.set_ex(key, value, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        self.0.delete(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        value: &str,
    ) -> Result<bool, ApiError> {
        self.0.compare_and_swap(key, expected, value).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, ApiError> {
        self.0.compare_and_delete(key, expected).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, ApiError> {
        self.0.ttl(key).await
    }
}

/// Refuses to write rate markers; everything else reaches the inner store.
#[derive(Clone, Default)]
struct RateMarkerDownStore(MemoryCodeStore);

impl CodeStore for RateMarkerDownStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ApiError> {
        self.0.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), ApiError> {
        if key.contains("_rate:") {
            return Err(ApiError::Internal(anyhow::anyhow!("redis write refused")));
        }
        self.0.set_ex(key, value, ttl_secs).await
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        self.0.delete(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        value: &str,
    ) -> Result<bool, ApiError> {
        self.0.compare_and_swap(key, expected, value).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, ApiError> {
        self.0.compare_and_delete(key, expected).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<u64>, ApiError> {
        self.0.ttl(key).await
    }
}

async fn issuer(
    store: &MemoryCodeStore,
    mailer: &MockMailer,
) -> IssueCodeUseCase<MockUserRepo, MemoryCodeStore, MockMailer> {
    IssueCodeUseCase {
        users: MockUserRepo::new(vec![test_user(EMAIL, "alice").await]),
        store: store.clone(),
        mailer: mailer.clone(),
    }
}

fn verify_input(code: &str, flow: CodeFlow) -> VerifyCodeInput {
    VerifyCodeInput {
        email: EMAIL.to_owned(),
        code: code.to_owned(),
        flow,
    }
}

// ── IssueCode ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_code_and_mask_email() {
    let store = MemoryCodeStore::new();
    let mailer = MockMailer::new();
    let uc = issuer(&store, &mailer).await;

    let output = uc
        .execute(IssueCodeInput {
            email: " Alice@QQ.com ".to_owned(),
            flow: CodeFlow::PasswordReset,
        })
        .await
        .unwrap();

    assert_eq!(output.masked_email, "a***@qq.com");
    assert_eq!(output.expires_in, 600);

    let raw = store.raw("password_reset:alice@qq.com").unwrap();
    let record: VerificationRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(record.attempts, 0);
    assert_eq!(Some(record.code), mailer.last_code());
    assert!(store.contains("password_reset_rate:alice@qq.com"));
}

#[tokio::test]
async fn should_use_shorter_ttl_for_login_codes() {
    let store = MemoryCodeStore::new();
    let mailer = MockMailer::new();
    let output = issuer(&store, &mailer)
        .await
        .execute(IssueCodeInput {
            email: EMAIL.to_owned(),
            flow: CodeFlow::LoginCode,
        })
        .await
        .unwrap();

    assert_eq!(output.expires_in, 300);
    assert!(store.contains("login_code:alice@qq.com"));
    assert!(!store.contains("password_reset:alice@qq.com"));
}

#[tokio::test]
async fn should_rate_limit_second_request_within_window() {
    let store = MemoryCodeStore::new();
    let mailer = MockMailer::new();
    let uc = issuer(&store, &mailer).await;
    let input = || IssueCodeInput {
        email: EMAIL.to_owned(),
        flow: CodeFlow::LoginCode,
    };

    uc.execute(input()).await.unwrap();
    let result = uc.execute(input()).await;

    assert!(
        matches!(result, Err(ApiError::RateLimited { retry_after_secs }) if (1..=60).contains(&retry_after_secs)),
        "expected RateLimited, got {result:?}"
    );
    assert_eq!(mailer.sent_count(), 1, "throttled request must not send mail");
}

#[tokio::test]
async fn should_rate_limit_flows_independently() {
    let store = MemoryCodeStore::new();
    let mailer = MockMailer::new();
    let uc = issuer(&store, &mailer).await;

    for flow in [CodeFlow::LoginCode, CodeFlow::PasswordReset] {
        uc.execute(IssueCodeInput {
            email: EMAIL.to_owned(),
            flow,
        })
        .await
        .unwrap();
    }
    assert_eq!(mailer.sent_count(), 2);
}

#[tokio::test]
async fn should_return_not_found_for_unknown_email() {
    let uc = IssueCodeUseCase {
        users: MockUserRepo::empty(),
        store: MemoryCodeStore::new(),
        mailer: MockMailer::new(),
    };

    let result = uc
        .execute(IssueCodeInput {
            email: "nobody@qq.com".to_owned(),
            flow: CodeFlow::LoginCode,
        })
        .await;

    assert!(
        matches!(&result, Err(ApiError::NotFound(msg)) if msg == "该邮箱未注册"),
        "expected NotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_malformed_email_before_lookup() {
    let store = MemoryCodeStore::new();
    let mailer = MockMailer::new();
    let result = issuer(&store, &mailer)
        .await
        .execute(IssueCodeInput {
            email: "not-an-email".to_owned(),
            flow: CodeFlow::LoginCode,
        })
        .await;

    assert!(
        matches!(result, Err(ApiError::Validation(_))),
        "expected Validation, got {result:?}"
    );
}

#[tokio::test]
async fn should_refuse_password_reset_for_google_only_account() {
    let uc = IssueCodeUseCase {
        users: MockUserRepo::new(vec![google_user("g@gmail.com", "guser", "sub-1")]),
        store: MemoryCodeStore::new(),
        mailer: MockMailer::new(),
    };

    let result = uc
        .execute(IssueCodeInput {
            email: "g@gmail.com".to_owned(),
            flow: CodeFlow::PasswordReset,
        })
        .await;

    assert!(
        matches!(&result, Err(ApiError::Validation(msg)) if msg.contains("Google")),
        "expected Validation, got {result:?}"
    );
}

#[tokio::test]
async fn should_roll_back_record_when_delivery_fails() {
    let store = MemoryCodeStore::new();
    let mailer = MockMailer::failing();
    let uc = issuer(&store, &mailer).await;

    let result = uc
        .execute(IssueCodeInput {
            email: EMAIL.to_owned(),
            flow: CodeFlow::PasswordReset,
        })
        .await;

    assert!(
        matches!(result, Err(ApiError::Delivery(_))),
        "expected Delivery, got {result:?}"
    );
    assert!(
        !store.contains("password_reset:alice@qq.com"),
        "undelivered record must be removed"
    );
}

#[tokio::test]
async fn should_issue_code_when_rate_marker_write_fails() {
    let inner = MemoryCodeStore::new();
    let mailer = MockMailer::new();
    let uc = IssueCodeUseCase {
        users: MockUserRepo::new(vec![test_user(EMAIL, "alice").await]),
        store: RateMarkerDownStore(inner.clone()),
        mailer: mailer.clone(),
    };

    let output = uc
        .execute(IssueCodeInput {
            email: EMAIL.to_owned(),
            flow: CodeFlow::LoginCode,
        })
        .await
        .unwrap();

    assert_eq!(output.masked_email, "a***@qq.com");
    assert_eq!(mailer.sent_count(), 1);
    assert!(inner.contains("login_code:alice@qq.com"));
    assert!(!inner.contains("login_code_rate:alice@qq.com"));
}

#[tokio::test]
async fn should_issue_code_once_rate_marker_lapsed() {
    let store = MemoryCodeStore::new();
    let mailer = MockMailer::new();
    store.entries.lock().unwrap().insert(
        "login_code_rate:alice@qq.com".to_owned(),
        ("1".to_owned(), Instant::now()),
    );

    issuer(&store, &mailer)
        .await
        .execute(IssueCodeInput {
            email: EMAIL.to_owned(),
            flow: CodeFlow::LoginCode,
        })
        .await
        .unwrap();
    assert_eq!(mailer.sent_count(), 1);
}

// ── VerifyCode ───────────────────────────────────────────────────────────────

async fn issue(store: &MemoryCodeStore, flow: CodeFlow) -> String {
    let mailer = MockMailer::new();
    issuer(store, &mailer)
        .await
        .execute(IssueCodeInput {
            email: EMAIL.to_owned(),
            flow,
        })
        .await
        .unwrap();
    mailer.last_code().unwrap()
}

#[tokio::test]
async fn should_accept_correct_code_exactly_once() {
    let store = MemoryCodeStore::new();
    let code = issue(&store, CodeFlow::PasswordReset).await;
    let verifier = VerifyCodeUseCase {
        store: store.clone(),
    };

    verifier
        .execute(verify_input(&code, CodeFlow::PasswordReset))
        .await
        .unwrap();

    let again = verifier
        .execute(verify_input(&code, CodeFlow::PasswordReset))
        .await;
    assert!(
        matches!(again, Err(ApiError::Expired)),
        "second use must fail, got {again:?}"
    );
}

#[tokio::test]
async fn should_not_accept_code_from_other_flow() {
    let store = MemoryCodeStore::new();
    let code = issue(&store, CodeFlow::LoginCode).await;
    let verifier = VerifyCodeUseCase { store };

    let result = verifier
        .execute(verify_input(&code, CodeFlow::PasswordReset))
        .await;
    assert!(
        matches!(result, Err(ApiError::Expired)),
        "expected Expired, got {result:?}"
    );
}

#[tokio::test]
async fn should_count_failures_and_lock_after_five() {
    let store = MemoryCodeStore::new();
    let code = issue(&store, CodeFlow::LoginCode).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let verifier = VerifyCodeUseCase {
        store: store.clone(),
    };

    for attempt in 1..=5u32 {
        let result = verifier
            .execute(verify_input(wrong, CodeFlow::LoginCode))
            .await;
        assert!(
            matches!(result, Err(ApiError::CodeMismatch)),
            "attempt {attempt}: expected CodeMismatch, got {result:?}"
        );
        let raw = store.raw("login_code:alice@qq.com").unwrap();
        let record: VerificationRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.attempts, attempt);
    }

    // Even the right code is refused once the budget is spent.
    let result = verifier
        .execute(verify_input(&code, CodeFlow::LoginCode))
        .await;
    assert!(
        matches!(result, Err(ApiError::TooManyAttempts)),
        "expected TooManyAttempts, got {result:?}"
    );
    assert!(!store.contains("login_code:alice@qq.com"));
}

#[tokio::test]
async fn should_keep_remaining_ttl_after_mismatch() {
    let store = MemoryCodeStore::new();
    let code = issue(&store, CodeFlow::PasswordReset).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let key = "password_reset:alice@qq.com";
    let raw = store.raw(key).unwrap();
    store.set_ex(key, &raw, 30).await.unwrap();

    let result = VerifyCodeUseCase {
        store: store.clone(),
    }
    .execute(verify_input(wrong, CodeFlow::PasswordReset))
    .await;
    assert!(
        matches!(result, Err(ApiError::CodeMismatch)),
        "expected CodeMismatch, got {result:?}"
    );

    let remaining = store.ttl(key).await.unwrap().unwrap();
    assert!(remaining <= 30, "deadline extended to {remaining}s");
    let record: VerificationRecord = serde_json::from_str(&store.raw(key).unwrap()).unwrap();
    assert_eq!(record.attempts, 1);
}

#[tokio::test]
async fn should_compare_codes_exactly() {
    let store = MemoryCodeStore::new();
    let code = issue(&store, CodeFlow::LoginCode).await;

    let result = VerifyCodeUseCase {
        store: store.clone(),
    }
    .execute(verify_input(&format!(" {code} "), CodeFlow::LoginCode))
    .await;
    assert!(
        matches!(result, Err(ApiError::CodeMismatch)),
        "expected CodeMismatch, got {result:?}"
    );
}

#[tokio::test]
async fn should_cap_concurrent_wrong_guesses_at_five() {
    let inner = MemoryCodeStore::new();
    let code = issue(&inner, CodeFlow::LoginCode).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let verifier = VerifyCodeUseCase {
        store: InterleavingStore(inner.clone()),
    };
    let shared = &verifier;
    let guess = move || shared.execute(verify_input(wrong, CodeFlow::LoginCode));

    let results = tokio::join!(
        guess(),
        guess(),
        guess(),
        guess(),
        guess(),
        guess(),
        guess(),
        guess()
    );
    let results = [
        results.0, results.1, results.2, results.3, results.4, results.5, results.6, results.7,
    ];

    let mismatches = results
        .iter()
        .filter(|r| matches!(r, Err(ApiError::CodeMismatch)))
        .count();
    assert_eq!(mismatches, 5);
    for result in &results {
        assert!(
            matches!(
                result,
                Err(ApiError::CodeMismatch | ApiError::TooManyAttempts | ApiError::Expired)
            ),
            "unexpected outcome {result:?}"
        );
    }

    let last = verifier
        .execute(verify_input(&code, CodeFlow::LoginCode))
        .await;
    assert!(last.is_err(), "correct code accepted after the budget was spent");
    assert!(!inner.contains("login_code:alice@qq.com"));
}

#[tokio::test]
async fn should_report_expired_when_record_is_gone() {
    let store = MemoryCodeStore::new();
    let code = issue(&store, CodeFlow::LoginCode).await;
    store.expire("login_code:alice@qq.com");

    let result = VerifyCodeUseCase { store }
        .execute(verify_input(&code, CodeFlow::LoginCode))
        .await;
    assert!(
        matches!(result, Err(ApiError::Expired)),
        "expected Expired, got {result:?}"
    );
}

#[tokio::test]
async fn should_report_expired_when_record_deadline_passed() {
    let store = MemoryCodeStore::new();
    let code = issue(&store, CodeFlow::LoginCode).await;
    let key = "login_code:alice@qq.com";

    let mut record: VerificationRecord = serde_json::from_str(&store.raw(key).unwrap()).unwrap();
    record.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
    store.replace(key, &serde_json::to_string(&record).unwrap());

    let result = VerifyCodeUseCase {
        store: store.clone(),
    }
    .execute(verify_input(&code, CodeFlow::LoginCode))
    .await;
    assert!(
        matches!(result, Err(ApiError::Expired)),
        "expected Expired, got {result:?}"
    );
    assert!(!store.contains(key), "expired record must be deleted");
}

#[tokio::test]
async fn should_reject_corrupt_record() {
    let store = MemoryCodeStore::new();
    issue(&store, CodeFlow::LoginCode).await;
    store.replace("login_code:alice@qq.com", "{not json");

    let result = VerifyCodeUseCase { store }
        .execute(verify_input("123456", CodeFlow::LoginCode))
        .await;
    assert!(
        matches!(result, Err(ApiError::InvalidCode)),
        "expected InvalidCode, got {result:?}"
    );
}
