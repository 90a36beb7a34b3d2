use axum::extract::FromRef;
use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use linetime_auth_types::identity::AccessTokenSecret;

use crate::infra::cache::RedisCodeStore;
use crate::infra::db::{DbEventRepository, DbSpaceRepository, DbUserRepository};
use crate::infra::email::SmtpMailer;
use crate::infra::google::GoogleTokenVerifier;
use crate::infra::storage::S3Storage;
use crate::usecase::token::TokenSettings;
use crate::usecase::upload::UploadSettings;
use crate::usecase::verification::VerifyCodeUseCase;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub tokens: TokenSettings,
    pub mailer: SmtpMailer,
    pub storage: S3Storage,
    pub google: GoogleTokenVerifier,
    pub upload: UploadSettings,
    pub invite_base_url: String,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn space_repo(&self) -> DbSpaceRepository {
        DbSpaceRepository {
            db: self.db.clone(),
        }
    }

    pub fn event_repo(&self) -> DbEventRepository {
        DbEventRepository {
            db: self.db.clone(),
        }
    }

    pub fn code_store(&self) -> RedisCodeStore {
        RedisCodeStore {
            pool: self.redis.clone(),
        }
    }

    pub fn code_verifier(&self) -> VerifyCodeUseCase<RedisCodeStore> {
        VerifyCodeUseCase {
            store: self.code_store(),
        }
    }
}

impl FromRef<AppState> for AccessTokenSecret {
    fn from_ref(state: &AppState) -> Self {
        AccessTokenSecret(state.tokens.secret.clone())
    }
}
