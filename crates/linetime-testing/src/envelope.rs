//! Readers for `{code, message, data}` responses.

use axum::body::to_bytes;
use axum::response::Response;
use http::StatusCode;
use serde_json::Value;

/// Read the body as JSON, asserting HTTP 200 (every envelope answer uses it).
pub async fn read_envelope(resp: Response) -> Value {
    assert_eq!(resp.status(), StatusCode::OK, "envelope must use HTTP 200");
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the envelope carries `code` and `message`.
pub async fn assert_envelope(resp: Response, code: u16, message: &str) -> Value {
    let json = read_envelope(resp).await;
    assert_eq!(json["code"], code, "unexpected envelope: {json}");
    assert_eq!(json["message"], message, "unexpected envelope: {json}");
    json
}
