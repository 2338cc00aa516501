//! API Integration Tests
//!
//! The router runs over the in-memory user store, so no database is needed.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use daybook_api::auth::jwt::{generate_all_tokens, JwtConfig};
use daybook_api::{create_router_for_testing, create_router_with_state_for_testing};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

fn signup_body(email: &str, phone: &str) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": email,
        "phone": phone,
        "password": "password123"
    })
}

async fn signup(app: &Router, email: &str, phone: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request("POST", "/users/signup", Some(signup_body(email, phone))),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/users/login",
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();
    let (status, json) = send(&app, create_json_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = create_router_for_testing();
    let (status, json) = send(&app, create_json_request("GET", "/ready", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["database"], true);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = create_router_for_testing();
    let (status, json) = send(
        &app,
        create_json_request("GET", "/api-docs/openapi.json", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/users/login"].is_object());
}

// =============================================================================
// Signup Tests
// =============================================================================

#[tokio::test]
async fn test_signup_returns_inserted_id() {
    let app = create_router_for_testing();
    let (status, json) = signup(&app, "a@x.com", "555-0001").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["inserted_id"].is_string());
}

#[tokio::test]
async fn test_signup_duplicate_email_and_phone() {
    let (app, state) = create_router_with_state_for_testing();
    let (status, first) = signup(&app, "a@x.com", "555-0001").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = signup(&app, "a@x.com", "555-0002").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "This email already exists");

    let (status, json) = signup(&app, "b@x.com", "555-0001").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "This phone number already exists");

    // Only the first signup produced a document
    let stored = state
        .auth
        .get_user(first["inserted_id"].as_str().unwrap())
        .await
        .unwrap();
    assert_eq!(stored.email, "a@x.com");
    let (status, _) = login(&app, "b@x.com", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let app = create_router_for_testing();

    let (status, json) = signup(&app, "not-an-email", "555-0001").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("email"));

    let mut body = signup_body("a@x.com", "555-0001");
    body["password"] = json!("short");
    let (status, json) = send(
        &app,
        create_json_request("POST", "/users/signup", Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn test_signup_malformed_body() {
    let app = create_router_for_testing();
    let request = Request::builder()
        .method("POST")
        .uri("/users/signup")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn test_login_returns_user_with_fresh_tokens() {
    let app = create_router_for_testing();
    signup(&app, "a@x.com", "555-0001").await;

    let (status, json) = login(&app, "a@x.com", "password123").await;
    assert_eq!(status, StatusCode::OK);

    let user = &json["user"];
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["first_name"], "Ada");
    assert!(user["token"].is_string());
    assert!(user["refresh_token"].is_string());
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email() {
    let app = create_router_for_testing();
    signup(&app, "a@x.com", "555-0001").await;

    let (status, json) = login(&app, "a@x.com", "wrongpassword").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "login or password is incorrect");

    let (status, json) = login(&app, "nobody@x.com", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "login or password is incorrect");
}

#[tokio::test]
async fn test_login_missing_fields() {
    let app = create_router_for_testing();
    let (status, json) = send(
        &app,
        create_json_request("POST", "/users/login", Some(json!({ "email": "a@x.com" }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Email and password are required");
}

// =============================================================================
// Auth Gate Tests
// =============================================================================

#[tokio::test]
async fn test_gate_rejects_missing_token() {
    let app = create_router_for_testing();
    let (status, json) = send(&app, create_json_request("GET", "/users/me", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "No Authorization header provided");
}

#[tokio::test]
async fn test_gate_rejects_garbage_token() {
    let app = create_router_for_testing();
    let request = with_bearer(create_json_request("GET", "/users/me", None), "abc.def.ghi");
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "the token is invalid");
}

#[tokio::test]
async fn test_gate_rejects_expired_token() {
    let app = create_router_for_testing();
    let config = JwtConfig {
        secret: "test-secret".to_string(),
        access_expiration_secs: 0,
        refresh_expiration_secs: 0,
    };
    let pair = generate_all_tokens(&config, "a@x.com", "Ada", "Lovelace", "uid-1").unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let request = with_bearer(create_json_request("GET", "/users/me", None), &pair.token);
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "token is expired");
}

#[tokio::test]
async fn test_gate_rejects_refresh_token() {
    let app = create_router_for_testing();
    signup(&app, "a@x.com", "555-0001").await;
    let (_, json) = login(&app, "a@x.com", "password123").await;
    let refresh_token = json["user"]["refresh_token"].as_str().unwrap();

    let request = with_bearer(create_json_request("GET", "/users/me", None), refresh_token);
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_bearer_and_token_header() {
    let app = create_router_for_testing();
    signup(&app, "a@x.com", "555-0001").await;
    let (_, json) = login(&app, "a@x.com", "password123").await;
    let token = json["user"]["token"].as_str().unwrap().to_string();

    let request = with_bearer(create_json_request("GET", "/users/me", None), &token);
    let (status, me) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
    assert!(me.get("password").is_none());

    let mut request = create_json_request("GET", "/users/me", None);
    request
        .headers_mut()
        .insert("token", token.parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Refresh and Password Tests
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_token_pair() {
    let app = create_router_for_testing();
    signup(&app, "a@x.com", "555-0001").await;
    let (_, json) = login(&app, "a@x.com", "password123").await;
    let refresh_token = json["user"]["refresh_token"].as_str().unwrap().to_string();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let (status, pair) = send(
        &app,
        create_json_request(
            "POST",
            "/users/refresh",
            Some(json!({ "refresh_token": refresh_token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(pair["token"].is_string());
    assert_ne!(pair["refresh_token"], json!(refresh_token));

    // The previous refresh token is now superseded
    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/users/refresh",
            Some(json!({ "refresh_token": refresh_token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = create_router_for_testing();
    let (_, inserted) = signup(&app, "a@x.com", "555-0001").await;
    let id = inserted["inserted_id"].as_str().unwrap().to_string();
    let (_, json) = login(&app, "a@x.com", "password123").await;
    let token = json["user"]["token"].as_str().unwrap().to_string();

    let body = json!({ "current_password": "password123", "new_password": "newpassword456" });

    // Someone else's id
    let other = "550e8400-e29b-41d4-a716-446655440000";
    let request = with_bearer(
        create_json_request("PUT", &format!("/users/{other}/password"), Some(body.clone())),
        &token,
    );
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Malformed id
    let request = with_bearer(
        create_json_request("PUT", "/users/not-a-uuid/password", Some(body.clone())),
        &token,
    );
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = with_bearer(
        create_json_request("PUT", &format!("/users/{id}/password"), Some(body)),
        &token,
    );
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], json!(id));
    assert_eq!(json["message"], "Password updated successfully!");
    assert_eq!(json["updated"], 1);

    let (status, _) = login(&app, "a@x.com", "password123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "a@x.com", "newpassword456").await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn test_signup_login_scenario() {
    let app = create_router_for_testing();

    let (status, _) = signup(&app, "a@x.com", "555-0001").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = signup(&app, "a@x.com", "555-0001").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = login(&app, "a@x.com", "password123").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["user"]["token"].is_string());

    let (status, json) = login(&app, "a@x.com", "not-the-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "login or password is incorrect");
}
