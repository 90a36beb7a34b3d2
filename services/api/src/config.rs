use serde::Deserialize;

use linetime_core::config::Config;

/// API service configuration. Each field maps to the upper-case env var of
/// the same name (`jwt_secret` ← `JWT_SECRET`).
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// TCP port to listen on (default 8080).
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,

    /// HMAC secret for signing access and refresh tokens.
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub jwt_access_expire_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub jwt_refresh_expire_secs: u64,

    pub s3_endpoint: String,
    #[serde(default = "default_s3_region")]
    pub s3_region: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_bucket: String,
    /// Base URL for returned object links; `{s3_endpoint}/{s3_bucket}` when unset.
    #[serde(default)]
    pub s3_public_url: Option<String>,

    /// Max bytes per uploaded file (default 10 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_files")]
    pub max_files_per_upload: usize,
    /// Comma-separated extension allow-list.
    #[serde(default = "default_allowed_file_types")]
    pub allowed_file_types: String,

    /// Google OAuth client id; Google login is unavailable without it.
    #[serde(default)]
    pub google_client_id: Option<String>,

    /// SMTP relay host; email codes cannot be delivered without it.
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,

    /// Prefix for invite links; the invite code is appended as a path segment.
    #[serde(default = "default_invite_base_url")]
    pub invite_base_url: String,
}

impl Config for ApiConfig {}

fn default_server_port() -> u16 {
    8080
}

fn default_access_ttl() -> u64 {
    2 * 60 * 60
}

fn default_refresh_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_s3_region() -> String {
    "us-east-1".to_owned()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_files() -> usize {
    9
}

fn default_allowed_file_types() -> String {
    "jpg,jpeg,png,gif,webp".to_owned()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "noreply@linetime.app".to_owned()
}

fn default_invite_base_url() -> String {
    "https://linetime.app/invite".to_owned()
}
