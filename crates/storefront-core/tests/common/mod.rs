//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::json;
use storefront_core::auth::MemoryTokenStore;
use storefront_core::ApiClient;
use wiremock::MockServer;

/// Unsigned JWT whose `exp` claim is `at`
pub fn token_expiring_at(at: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = json!({
        "token_type": "access",
        "exp": at.timestamp(),
        "jti": "3f1c",
        "user_id": 1
    });
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, body)
}

pub fn client(server: &MockServer, store: &Arc<MemoryTokenStore>) -> ApiClient {
    ApiClient::new(&server.uri(), store.clone()).unwrap()
}

/// Authorization header values of every request the server received
pub async fn authorization_headers(server: &MockServer) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            r.headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}
