//! Account registration and credential updates.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use super::{
    normalize_email,
    types::{error_response, ErrorBody, UserCredentials, UserResponse},
    valid_email,
};
use crate::auth::{AuthGateway, Rejection};
use crate::storage::UserWrite;

/// Normalize and validate incoming credentials, or produce the 400 response.
fn validated(payload: Option<Json<UserCredentials>>) -> Result<(String, String), Response> {
    let Some(Json(request)) = payload else {
        return Err(error_response(StatusCode::BAD_REQUEST, "Missing payload"));
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(error_response(StatusCode::BAD_REQUEST, "Invalid email"));
    }
    if request.password.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Password is required"));
    }

    Ok((email, request.password))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserCredentials,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn create_user(
    gateway: Extension<Arc<AuthGateway>>,
    payload: Option<Json<UserCredentials>>,
) -> Response {
    let (email, password) = match validated(payload) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let password_hash = match gateway.hash_password(&password).await {
        Ok(hash) => hash,
        Err(rejection) => return rejection.into_response(),
    };

    match gateway.users().create(&email, &password_hash).await {
        Ok(UserWrite::Saved(user)) => {
            (StatusCode::CREATED, Json(UserResponse::from(user))).into_response()
        }
        Ok(UserWrite::Conflict) => error_response(StatusCode::CONFLICT, "Email already registered"),
        Ok(UserWrite::NotFound) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
        Err(err) => {
            error!("Failed to create user: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/users",
    request_body = UserCredentials,
    params(
        ("Authorization" = String, Header, description = "Bearer <session token>")
    ),
    responses(
        (status = 200, description = "Credentials updated", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing or invalid session token", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "users"
)]
#[instrument(skip_all)]
pub async fn update_user(
    headers: HeaderMap,
    gateway: Extension<Arc<AuthGateway>>,
    payload: Option<Json<UserCredentials>>,
) -> Response {
    // Authenticate before looking at the body.
    let identity = match gateway.authenticate(&headers) {
        Ok(identity) => identity,
        Err(rejection) => return rejection.into_response(),
    };

    let (email, password) = match validated(payload) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let password_hash = match gateway.hash_password(&password).await {
        Ok(hash) => hash,
        Err(rejection) => return rejection.into_response(),
    };

    match gateway
        .users()
        .update_credentials(identity.user_id, &email, &password_hash)
        .await
    {
        Ok(UserWrite::Saved(user)) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Ok(UserWrite::Conflict) => error_response(StatusCode::CONFLICT, "Email already registered"),
        // The token outlived its user.
        Ok(UserWrite::NotFound) => {
            Rejection::Unauthorized(crate::auth::Error::NotFound).into_response()
        }
        Err(err) => {
            error!("Failed to update user: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}
