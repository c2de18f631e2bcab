use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chirpy::{
    api::{router, AdminConfig},
    auth::{AuthConfig, AuthGateway},
    storage::MemoryStore,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(platform: &str) -> Router {
    let store = Arc::new(MemoryStore::new());
    let config = AuthConfig::new(SecretString::from("integration-secret"));
    let gateway = Arc::new(AuthGateway::new(config, store.clone(), store));
    router(gateway, AdminConfig::new(platform.to_string()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn register_and_login(app: &Router, email: &str, password: &str) -> Result<Value> {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body)
}

fn field<'a>(body: &'a Value, name: &str) -> Result<&'a str> {
    body.get(name)
        .and_then(Value::as_str)
        .with_context(|| format!("missing {name} in {body}"))
}

#[tokio::test]
async fn health_reports_build_info() -> Result<()> {
    let app = app("prod");
    let response = app
        .clone()
        .oneshot(Request::get("/api/healthz").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(field(&body, "name")?, "chirpy");
    Ok(())
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() -> Result<()> {
    let app = app("prod");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "a@example.com", "password": "secret123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(field(&body, "email")?, "a@example.com");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("hashed_password").is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "A@Example.com", "password": "other" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "not-an-email", "password": "secret123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "b@example.com", "password": "" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_returns_both_tokens() -> Result<()> {
    let app = app("prod");
    let body = register_and_login(&app, "a@example.com", "secret123").await?;

    assert_eq!(field(&body, "email")?, "a@example.com");
    assert_eq!(field(&body, "token")?.split('.').count(), 3);
    assert_eq!(field(&body, "refresh_token")?.len(), 43);
    Ok(())
}

#[tokio::test]
async fn login_failures_share_one_message() -> Result<()> {
    let app = app("prod");
    register_and_login(&app, "a@example.com", "secret123").await?;

    let (wrong_status, wrong_body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "a@example.com", "password": "secret124" })),
    )
    .await?;
    let (unknown_status, unknown_body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "b@example.com", "password": "secret123" })),
    )
    .await?;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(field(&wrong_body, "error")?, "incorrect email or password");
    Ok(())
}

#[tokio::test]
async fn refresh_and_revoke_lifecycle() -> Result<()> {
    let app = app("prod");
    let body = register_and_login(&app, "a@example.com", "secret123").await?;
    let refresh_token = field(&body, "refresh_token")?.to_string();

    let (status, refreshed) =
        send(&app, Method::POST, "/api/refresh", Some(&refresh_token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let session = field(&refreshed, "token")?.to_string();

    // The refreshed session token authenticates a session route.
    let (status, updated) = send(
        &app,
        Method::PUT,
        "/api/users",
        Some(&session),
        Some(json!({ "email": "new@example.com", "password": "n3w-secret" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&updated, "email")?, "new@example.com");

    let (status, body) =
        send(&app, Method::POST, "/api/revoke", Some(&refresh_token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::POST, "/api/refresh", Some(&refresh_token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Revoking again is accepted.
    let (status, _) = send(&app, Method::POST, "/api/revoke", Some(&refresh_token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn token_endpoints_require_credentials() -> Result<()> {
    let app = app("prod");

    for uri in ["/api/refresh", "/api/revoke"] {
        let (status, _) = send(&app, Method::POST, uri, None, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");

        let (status, _) = send(&app, Method::POST, uri, Some("unknown-token"), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users",
        Some("not.a.token"),
        Some(json!({ "email": "a@example.com", "password": "secret123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(field(&body, "error")?, "unauthorized");
    Ok(())
}

#[tokio::test]
async fn refresh_token_is_not_a_session_token() -> Result<()> {
    let app = app("prod");
    let body = register_and_login(&app, "a@example.com", "secret123").await?;
    let refresh_token = field(&body, "refresh_token")?;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/users",
        Some(refresh_token),
        Some(json!({ "email": "a@example.com", "password": "secret123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn reset_is_dev_only() -> Result<()> {
    let prod = app("prod");
    let (status, _) = send(&prod, Method::POST, "/admin/reset", None, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let dev = app("dev");
    let body = register_and_login(&dev, "a@example.com", "secret123").await?;
    let refresh_token = field(&body, "refresh_token")?.to_string();

    let (status, reset) = send(&dev, Method::POST, "/admin/reset", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset.get("users_deleted").and_then(Value::as_u64), Some(1));
    assert_eq!(
        reset.get("refresh_tokens_deleted").and_then(Value::as_u64),
        Some(1)
    );

    let (status, _) = send(&dev, Method::POST, "/api/refresh", Some(&refresh_token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &dev,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "a@example.com", "password": "secret123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let app = app("prod");
    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc.pointer("/paths/~1api~1login").is_some());
    Ok(())
}
