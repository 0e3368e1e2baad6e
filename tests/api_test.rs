//! HTTP surface: routing, session cookie, error bodies.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use hrdesk::config::Config;
use hrdesk::{api, AppState, DbPool};

fn app(db: DbPool) -> Router {
    let mut config = Config::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    api::create_router(Arc::new(AppState::new(config, db)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cookie, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_json_with_cookie(uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Log in and return the `token=...` pair for the Cookie header
async fn login(app: &Router, username: &str) -> String {
    let (status, cookie, _) = send(
        app,
        post_json(
            "/api/auth/login",
            json!({ "username": username, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let cookie = cookie.expect("login should set the session cookie");
    cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn health_check() {
    let app = app(setup().await);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = app(setup().await);

    let (status, _, body) = send(
        &app,
        Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
    assert!(body["message"].is_string());

    let (status, _, _) = send(&app, get_with_cookie("/api/auth/me", "token=garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_cookie_and_me_returns_the_user() {
    let db = setup().await;
    employee(&db, "jane", "Jane Doe").await;
    let app = app(db);

    let (status, cookie, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({ "username": "jane", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert!(body["user"].get("passwordHash").is_none());
    let cookie = cookie.unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let session = cookie.split(';').next().unwrap().to_string();
    let (status, _, body) = send(&app, get_with_cookie("/api/auth/me", &session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "jane");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let db = setup().await;
    employee(&db, "jane", "Jane Doe").await;
    let app = app(db);

    let (status, cookie, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({ "username": "jane", "password": "not-the-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn signup_waits_for_activation() {
    let app = app(setup().await);

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/auth/signup",
            json!({
                "username": "newhire",
                "email": "newhire@example.com",
                "password": PASSWORD,
                "fullName": "New Hire"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["isActive"], false);

    let (status, cookie, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({ "username": "newhire", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(cookie.is_none());
    assert_eq!(body["message"], "Account is pending activation");
}

#[tokio::test]
async fn signup_reports_field_errors() {
    let app = app(setup().await);

    let (status, _, body) = send(
        &app,
        post_json(
            "/api/auth/signup",
            json!({
                "username": "x",
                "email": "not-an-email",
                "password": "short",
                "fullName": "Someone"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("username"));
    assert!(details.contains_key("email"));
    assert!(details.contains_key("password"));
    assert!(!details.contains_key("fullName"));
}

#[tokio::test]
async fn admin_routes_are_forbidden_to_employees() {
    let db = setup().await;
    employee(&db, "jane", "Jane Doe").await;
    hr_admin(&db).await;
    let app = app(db);

    let jane = login(&app, "jane").await;
    let (status, _, body) = send(&app, get_with_cookie("/api/employees", &jane)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let hr = login(&app, "hr").await;
    let (status, _, body) = send(&app, get_with_cookie("/api/employees", &hr)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let db = setup().await;
    hr_admin(&db).await;
    let app = app(db);

    let hr = login(&app, "hr").await;
    let (status, _, body) = send(
        &app,
        get_with_cookie("/api/employees/00000000-0000-4000-8000-000000000000", &hr),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn malformed_bodies_are_json_validation_errors() {
    let db = setup().await;
    employee(&db, "jane", "Jane Doe").await;
    let app = app(db);
    let jane = login(&app, "jane").await;

    let (status, _, body) = send(
        &app,
        post_json_with_cookie(
            "/api/leave/request",
            &jane,
            json!({
                "type": "Maternity",
                "startDate": "2026-11-02",
                "endDate": "2026-11-06",
                "reason": "Family"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("Maternity"));

    let (status, _, body) = send(
        &app,
        post_json_with_cookie(
            "/api/leave/request",
            &jane,
            json!({ "type": "Vacation", "endDate": "2026-11-06" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let not_json = Request::builder()
        .method("POST")
        .uri("/api/leave/request")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, &jane)
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, not_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn invalid_query_values_are_json_validation_errors() {
    let db = setup().await;
    employee(&db, "jane", "Jane Doe").await;
    let app = app(db);
    let jane = login(&app, "jane").await;

    let (status, _, body) =
        send(&app, get_with_cookie("/api/leave/requests?status=someday", &jane)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(body["message"].is_string());

    let (status, _, _) =
        send(&app, get_with_cookie("/api/leave/requests?status=pending", &jane)).await;
    assert_eq!(status, StatusCode::OK);
}
