//! Auth API Integration Tests

use animehub_auth::{config::Config, AppState, AuthApi, ManualClock};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_app() -> (Router, Arc<ManualClock>) {
    test_app_with(Config::default())
}

fn test_app_with(config: Config) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let state = AppState::from_config(&config, clock.clone()).unwrap();
    (AuthApi::create_router(state), clock)
}

/// Rate-limit check from `peer`, claiming to be `forwarded_for`
fn rate_limit_from(peer: &str, forwarded_for: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/auth/check-rate-limit")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(json!({ "identifier": "bob" }).to_string()))
        .unwrap();
    let peer: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn post(path: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn call_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    call(app, post(path, body.to_string())).await
}

async fn create_session(app: &Router, user_id: &str) -> (String, String) {
    let (status, body) = call_json(
        app,
        "/api/auth/create-session",
        json!({ "userId": user_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["sessionId"].as_str().unwrap().to_string(),
        body["csrfToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (app, _clock) = test_app();
    let (session_id, csrf_token) = create_session(&app, "alice").await;
    assert!(!session_id.is_empty());
    assert!(!csrf_token.is_empty());

    let (_, body) = call_json(
        &app,
        "/api/auth/validate-session",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(body, json!({ "valid": true }));

    let (_, body) = call_json(
        &app,
        "/api/auth/update-activity",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = call_json(
        &app,
        "/api/auth/invalidate-session",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, body) = call_json(
        &app,
        "/api/auth/validate-session",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(body, json!({ "valid": false }));

    // invalidating again is still a success
    let (_, body) = call_json(
        &app,
        "/api/auth/invalidate-session",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_idle_session_expires() {
    let (app, clock) = test_app();
    let (session_id, _) = create_session(&app, "alice").await;

    clock.advance(Duration::from_secs(31 * 60));

    let (_, body) = call_json(
        &app,
        "/api/auth/validate-session",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(body, json!({ "valid": false }));

    let (_, body) = call_json(
        &app,
        "/api/auth/update-activity",
        json!({ "sessionId": session_id }),
    )
    .await;
    assert_eq!(body, json!({ "success": false }));
}

#[tokio::test]
async fn test_create_session_requires_user_id() {
    let (app, _clock) = test_app();

    for body in [json!({}), json!({ "userId": "" }), json!({ "userId": "   " })] {
        let (status, body) = call_json(&app, "/api/auth/create-session", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
        assert_eq!(body["error"], "userId is required");
    }

    let (status, body) = call(&app, post("/api/auth/create-session", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_malformed_bodies_get_benign_defaults() {
    let (app, _clock) = test_app();

    let (status, body) = call(&app, post("/api/auth/validate-session", "garbage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false }));

    let (status, body) = call_json(&app, "/api/auth/update-activity", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false }));

    let (status, body) = call_json(&app, "/api/auth/validate-csrf", json!({ "sessionId": "x" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false }));

    let (status, _) = call_json(&app, "/api/auth/invalidate-session", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_blocks_sixth_attempt() {
    let (app, _clock) = test_app();
    let request = json!({ "identifier": "bob", "type": "login" });

    for expected in [4, 3, 2, 1, 0] {
        let (status, body) = call_json(&app, "/api/auth/check-rate-limit", request.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "allowed": true, "remainingAttempts": expected }));
    }

    let (_, body) = call_json(&app, "/api/auth/check-rate-limit", request).await;
    assert_eq!(body, json!({ "allowed": false, "remainingAttempts": 0 }));

    // a different identifier has its own budget
    let (_, body) = call_json(
        &app,
        "/api/auth/check-rate-limit",
        json!({ "identifier": "carol" }),
    )
    .await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_rate_limit_window_resets() {
    let (app, clock) = test_app();
    let request = json!({ "identifier": "bob" });

    for _ in 0..6 {
        call_json(&app, "/api/auth/check-rate-limit", request.clone()).await;
    }
    clock.advance(Duration::from_secs(15 * 60 + 1));

    let (_, body) = call_json(&app, "/api/auth/check-rate-limit", request).await;
    assert_eq!(body, json!({ "allowed": true, "remainingAttempts": 4 }));
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_budget() {
    let (app, _clock) = test_app();

    let mut allowed = 0;
    for i in 0..50 {
        let forged = format!("198.51.100.{}", i + 1);
        let (_, body) = call(&app, rate_limit_from("192.0.2.10:40000", &forged)).await;
        if body["allowed"] == true {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 5);

    // a different peer still has its own budget
    let (_, body) = call(&app, rate_limit_from("192.0.2.11:40000", "198.51.100.1")).await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_trusted_proxy_keys_by_forwarded_client() {
    let mut config = Config::default();
    config.server.trust_proxy_headers = true;
    let (app, _clock) = test_app_with(config);
    let proxy = "10.0.0.1:443";

    for _ in 0..5 {
        call(&app, rate_limit_from(proxy, "203.0.113.7")).await;
    }
    let (_, body) = call(&app, rate_limit_from(proxy, "203.0.113.7")).await;
    assert_eq!(body["allowed"], false);

    let (_, body) = call(&app, rate_limit_from(proxy, "198.51.100.2")).await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn test_rate_limit_requires_identifier() {
    let (app, _clock) = test_app();
    let (status, body) = call_json(&app, "/api/auth/check-rate-limit", json!({ "type": "login" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "identifier is required");
}

#[tokio::test]
async fn test_validate_password() {
    let (app, _clock) = test_app();

    let (status, body) = call_json(
        &app,
        "/api/auth/validate-password",
        json!({ "password": "Tr0ub4dor&Zeta" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["strength"], "strong");
    assert_eq!(body["errors"], json!([]));

    let (_, body) = call_json(&app, "/api/auth/validate-password", json!({ "password": "abc" })).await;
    assert_eq!(body["isValid"], false);
    assert_eq!(body["strength"], "weak");
    assert!(!body["errors"].as_array().unwrap().is_empty());

    let (status, _) = call_json(&app, "/api/auth/validate-password", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_csrf_token_is_bound_to_session() {
    let (app, _clock) = test_app();
    let (alice, alice_token) = create_session(&app, "alice").await;
    let (bob, _) = create_session(&app, "bob").await;

    let check = |session_id: &str, token: &str| {
        json!({ "sessionId": session_id, "csrfToken": token })
    };

    let (_, body) = call_json(&app, "/api/auth/validate-csrf", check(&alice, &alice_token)).await;
    assert_eq!(body, json!({ "valid": true }));

    // tokens are reusable while the session lives
    let (_, body) = call_json(&app, "/api/auth/validate-csrf", check(&alice, &alice_token)).await;
    assert_eq!(body, json!({ "valid": true }));

    let (_, body) = call_json(&app, "/api/auth/validate-csrf", check(&bob, &alice_token)).await;
    assert_eq!(body, json!({ "valid": false }));

    call_json(&app, "/api/auth/invalidate-session", json!({ "sessionId": alice })).await;
    let (_, body) = call_json(&app, "/api/auth/validate-csrf", check(&alice, &alice_token)).await;
    assert_eq!(body, json!({ "valid": false }));
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let (app, _clock) = test_app();

    for method in ["GET", "PUT", "DELETE"] {
        let request = Request::builder()
            .method(method)
            .uri("/api/auth/validate-session")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (app, _clock) = test_app();
    let padding = "a".repeat(2048);
    let body = json!({ "userId": padding }).to_string();

    // declared length
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/create-session")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, error) = call(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error["code"], "PAYLOAD_TOO_LARGE");

    // undeclared length
    let (status, _) = call(&app, post("/api/auth/create-session", body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (app, _clock) = test_app();

    let responses = [
        app.clone()
            .oneshot(post("/api/auth/create-session", json!({ "userId": "a" }).to_string()))
            .await
            .unwrap(),
        app.clone()
            .oneshot(post("/api/auth/create-session", "{}"))
            .await
            .unwrap(),
        app.clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap(),
    ];

    for response in responses {
        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
        assert!(headers.contains_key("content-security-policy"));
        assert!(headers.contains_key("strict-transport-security"));
    }
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, _clock) = test_app();
    create_session(&app, "alice").await;

    let (status, body) = call(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["activeSessions"], 1);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("animehub_sessions_created_total 1"));
    assert!(text.contains("animehub_active_sessions 1"));
}

#[tokio::test]
async fn test_health_excludes_expired_sessions() {
    let (app, clock) = test_app();
    create_session(&app, "alice").await;
    clock.advance(Duration::from_secs(31 * 60));
    create_session(&app, "bob").await;

    let (_, body) = call(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body["activeSessions"], 1);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(text.to_vec()).unwrap();
    assert!(text.contains("animehub_active_sessions 1"));
}
