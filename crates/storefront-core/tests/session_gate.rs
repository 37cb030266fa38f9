//! Integration tests for the session gate against a mock backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use common::{authorization_headers, client, token_expiring_at};
use serde_json::json;
use storefront_core::api::TOKEN_REFRESH_PATH;
use storefront_core::auth::{MemoryTokenStore, SessionGate};
use storefront_core::{Admission, CredentialPair, TokenKey, TokenStore, Verdict};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_expired_access_refreshed_through_backend() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let expired = token_expiring_at(now - ChronoDuration::seconds(10));
    let renewed = token_expiring_at(now + ChronoDuration::seconds(3600));

    Mock::given(method("POST"))
        .and(path(TOKEN_REFRESH_PATH))
        .and(body_json(json!({ "refresh": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": renewed })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_pair(&expired, "refresh-1"));
    let api = client(&server, &store);
    let gate = SessionGate::new(store.clone(), Arc::new(api));

    assert_eq!(gate.evaluate_at(now).await, Verdict::Granted);
    assert_eq!(store.get(TokenKey::Access), Some(renewed));
    assert_eq!(store.get(TokenKey::Refresh).as_deref(), Some("refresh-1"));

    // The refresh exchange never carries the (expired) access credential
    assert_eq!(authorization_headers(&server).await, vec![None]);
}

#[tokio::test]
async fn test_rejected_refresh_clears_credentials() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let expired = token_expiring_at(now - ChronoDuration::seconds(10));

    Mock::given(method("POST"))
        .and(path(TOKEN_REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_pair(&expired, "refresh-1"));
    let gate = Arc::new(SessionGate::new(store.clone(), Arc::new(client(&server, &store))));

    let mut activation = gate.activate();
    assert_eq!(activation.resolved().await, Verdict::Denied);
    assert!(matches!(activation.admission(), Admission::Redirect(nav) if nav.path == "/login" && nav.replace));
    assert_eq!(store.pair(), CredentialPair::default());
}

#[tokio::test]
async fn test_malformed_refresh_response_is_a_failure() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let expired = token_expiring_at(now - ChronoDuration::seconds(10));

    Mock::given(method("POST"))
        .and(path(TOKEN_REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_pair(&expired, "refresh-1"));
    let gate = SessionGate::new(store.clone(), Arc::new(client(&server, &store)));

    assert_eq!(gate.evaluate_at(now).await, Verdict::Denied);
    assert_eq!(store.pair(), CredentialPair::default());
}

#[tokio::test]
async fn test_slow_refresh_hits_deadline() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let expired = token_expiring_at(now - ChronoDuration::seconds(10));

    Mock::given(method("POST"))
        .and(path(TOKEN_REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_pair(&expired, "refresh-1"));
    let gate = SessionGate::new(store.clone(), Arc::new(client(&server, &store)))
        .with_refresh_timeout(Duration::from_millis(200));

    assert_eq!(gate.evaluate_at(now).await, Verdict::Denied);
    assert_eq!(store.pair(), CredentialPair::default());
}

#[tokio::test]
async fn test_live_access_makes_no_network_call() {
    let server = MockServer::start().await;
    let access = token_expiring_at(Utc::now() + ChronoDuration::minutes(5));

    Mock::given(method("POST"))
        .and(path(TOKEN_REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_pair(&access, "refresh-1"));
    let gate = SessionGate::new(store.clone(), Arc::new(client(&server, &store)));

    assert_eq!(gate.evaluate().await, Verdict::Granted);
}

#[tokio::test]
async fn test_requests_after_refresh_carry_new_access() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let expired = token_expiring_at(now - ChronoDuration::seconds(10));
    let renewed = token_expiring_at(now + ChronoDuration::seconds(3600));

    Mock::given(method("POST"))
        .and(path(TOKEN_REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": renewed })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/products/"))
        .and(header("authorization", format!("Bearer {}", renewed).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_pair(&expired, "refresh-1"));
    let api = client(&server, &store);
    let gate = SessionGate::new(store.clone(), Arc::new(api.clone()));

    assert_eq!(gate.evaluate_at(now).await, Verdict::Granted);
    let products = api.fetch_admin_products().await.unwrap();
    assert!(products.is_empty());
}
