//! Login and refresh token endpoints.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    normalize_email,
    types::{error_response, AuthResponse, ErrorBody, LoginRequest, LoginResponse, TokenResponse},
};
use crate::auth::{AuthGateway, Rejection};

const LOGIN_FAILED: &str = "incorrect email or password";

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session and refresh tokens issued", body = LoginResponse),
        (status = 400, description = "Missing payload", body = ErrorBody),
        (status = 401, description = "Incorrect email or password", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    gateway: Extension<Arc<AuthGateway>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let email = normalize_email(&request.email);
    match gateway
        .login(&email, &request.password, request.expires_in_seconds)
        .await
    {
        Ok(grant) => AuthResponse::Login(LoginResponse::from(grant)).into_response(),
        // Unknown email and wrong password look the same to the caller.
        Err(Rejection::Unauthorized(_)) => error_response(StatusCode::UNAUTHORIZED, LOGIN_FAILED),
        Err(rejection) => rejection.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/refresh",
    params(
        ("Authorization" = String, Header, description = "Bearer <refresh token>")
    ),
    responses(
        (status = 200, description = "New session token", body = TokenResponse),
        (status = 401, description = "Missing, unknown, expired or revoked refresh token", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    headers: HeaderMap,
    gateway: Extension<Arc<AuthGateway>>,
) -> Result<AuthResponse, Rejection> {
    let token = gateway.refresh(&headers).await?;
    Ok(AuthResponse::Token(TokenResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/revoke",
    params(
        ("Authorization" = String, Header, description = "Bearer <refresh token>")
    ),
    responses(
        (status = 204, description = "Refresh token revoked"),
        (status = 401, description = "Missing or unknown refresh token", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn revoke(
    headers: HeaderMap,
    gateway: Extension<Arc<AuthGateway>>,
) -> Result<AuthResponse, Rejection> {
    gateway.revoke(&headers).await?;
    Ok(AuthResponse::Empty)
}
