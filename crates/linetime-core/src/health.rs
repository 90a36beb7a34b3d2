use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

/// Handler for `GET /ping`. Answers `{"message":"pong"}`.
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// Handler for `GET /healthz`. Liveness check.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Handler for `GET /readyz`. Readiness check.
pub async fn readyz() -> StatusCode {
    StatusCode::OK
}
