use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use coachsync::{router, AppState, GatewayConfig};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json as body_matches, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "integration-test-secret-0123456789abcdef";

async fn submit(backend: &MockServer, body: &str) -> (StatusCode, Value) {
    let app = router(AppState::new(GatewayConfig::for_backend(backend.uri(), SECRET)).unwrap());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/waitlist")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_invalid_email_never_reaches_backend() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let (status, body) = submit(&backend, r#"{"email":"not-an-email"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid email" }));

    let (status, body) = submit(&backend, r#"{"email":"a@b.com","phone":"call me"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid phone" }));

    let (status, body) = submit(&backend, "nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid JSON" }));
}

#[tokio::test]
async fn test_valid_signup_is_forwarded() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/waitlist"))
        .and(body_matches(json!({ "email": "a@b.com", "phone": "555-1234567" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 9 })))
        .expect(1)
        .mount(&backend)
        .await;

    let (status, body) = submit(&backend, r#"{"email":"A@B.com ","phone":"555-1234567"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn test_duplicate_signup_relays_conflict() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/waitlist"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "detail": "Already on the waitlist" })))
        .mount(&backend)
        .await;

    let (status, body) = submit(&backend, r#"{"email":"a@b.com"}"#).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Already on the waitlist");
}
