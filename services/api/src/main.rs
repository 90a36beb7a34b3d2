use sea_orm::Database;
use tracing::{info, warn};

use linetime_api::config::ApiConfig;
use linetime_api::infra::email::{SmtpMailer, SmtpSettings};
use linetime_api::infra::google::GoogleTokenVerifier;
use linetime_api::infra::storage::{S3Settings, S3Storage};
use linetime_api::router::build_router;
use linetime_api::state::AppState;
use linetime_api::usecase::token::TokenSettings;
use linetime_api::usecase::upload::UploadSettings;
use linetime_core::config::Config;
use linetime_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ApiConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let mailer = SmtpMailer::new(SmtpSettings {
        host: config.smtp_host,
        port: config.smtp_port,
        username: config.smtp_username,
        password: config.smtp_password,
        from: config.smtp_from,
    })
    .expect("invalid SMTP configuration");
    if !mailer.is_configured() {
        warn!("SMTP_HOST is not set; verification emails cannot be delivered");
    }

    let storage = S3Storage::new(S3Settings {
        endpoint: config.s3_endpoint,
        region: config.s3_region,
        access_key: config.s3_access_key,
        secret_key: config.s3_secret_key,
        bucket: config.s3_bucket,
        public_url: config.s3_public_url,
    })
    .expect("invalid S3 configuration");

    if config.google_client_id.is_none() {
        warn!("GOOGLE_CLIENT_ID is not set; Google login is disabled");
    }
    let google =
        GoogleTokenVerifier::new(config.google_client_id).expect("failed to build HTTP client");

    let state = AppState {
        db,
        redis,
        tokens: TokenSettings {
            secret: config.jwt_secret,
            access_ttl_secs: config.jwt_access_expire_secs,
            refresh_ttl_secs: config.jwt_refresh_expire_secs,
        },
        mailer,
        storage,
        google,
        upload: UploadSettings {
            max_file_size: config.max_file_size,
            allowed_types: UploadSettings::parse_allowed_types(&config.allowed_file_types),
            max_files: config.max_files_per_upload,
        },
        invite_base_url: config.invite_base_url,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("linetime api listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
