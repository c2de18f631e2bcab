//! Development-only administrative endpoints.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info, instrument};

use super::types::{error_response, ErrorBody, ResetResponse};
use crate::auth::AuthGateway;

pub const DEV_PLATFORM: &str = "dev";

/// Deployment settings the admin endpoints depend on.
#[derive(Clone, Debug)]
pub struct AdminConfig {
    platform: String,
}

impl AdminConfig {
    #[must_use]
    pub fn new(platform: String) -> Self {
        Self { platform }
    }

    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    #[must_use]
    pub fn reset_enabled(&self) -> bool {
        self.platform == DEV_PLATFORM
    }
}

#[utoipa::path(
    post,
    path = "/admin/reset",
    responses(
        (status = 200, description = "All users and refresh tokens deleted", body = ResetResponse),
        (status = 403, description = "Not running on the dev platform", body = ErrorBody)
    ),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn reset(
    gateway: Extension<Arc<AuthGateway>>,
    admin: Extension<AdminConfig>,
) -> Response {
    if !admin.reset_enabled() {
        return error_response(
            StatusCode::FORBIDDEN,
            "reset is only allowed in dev environment",
        );
    }

    let refresh_tokens_deleted = match gateway.refresh_tokens().purge().await {
        Ok(count) => count,
        Err(err) => {
            error!("Failed to delete refresh tokens: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    };

    let users_deleted = match gateway.users().delete_all().await {
        Ok(count) => count,
        Err(err) => {
            error!("Failed to delete users: {err:#}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    };

    info!(users_deleted, refresh_tokens_deleted, "database reset");

    (
        StatusCode::OK,
        Json(ResetResponse {
            users_deleted,
            refresh_tokens_deleted,
        }),
    )
        .into_response()
}
