use crate::{
    api::handlers::{admin, auth, health, users},
    auth::{AuthConfig, AuthGateway},
    storage::PgStore,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug_span, error, info, Span};
use ulid::Ulid;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
pub mod openapi;

pub use handlers::admin::AdminConfig;

/// Build the application router with its middleware stack.
///
/// The gateway and admin settings are shared with handlers via `Extension`.
#[must_use]
pub fn router(gateway: Arc<AuthGateway>, admin: AdminConfig) -> Router {
    Router::new()
        .route("/api/healthz", get(health::health))
        .route("/api/users", post(users::create_user).put(users::update_user))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route("/admin/reset", post(admin::reset))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(gateway))
                .layer(Extension(admin)),
        )
}

/// Connect to the database, apply the schema and serve until ctrl-c.
///
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start
pub async fn new(port: u16, dsn: String, config: AuthConfig, admin: AdminConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    store
        .apply_schema()
        .await
        .context("Failed to apply database schema")?;

    if admin.reset_enabled() {
        info!("platform {} enables /admin/reset", admin.platform());
    }

    let gateway = Arc::new(AuthGateway::new(config, store.clone(), store));
    let app = router(gateway, admin);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}
