//! Request/response types for the account and token endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::LoginGrant;
use crate::storage::UserRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional shorter session lifetime in seconds.
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

/// Public view of a user; never includes the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
}

impl From<LoginGrant> for LoginResponse {
    fn from(grant: LoginGrant) -> Self {
        Self {
            id: grant.user.id,
            created_at: grant.user.created_at,
            updated_at: grant.user.updated_at,
            email: grant.user.email,
            token: grant.token,
            refresh_token: grant.refresh.token,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetResponse {
    pub users_deleted: u64,
    pub refresh_tokens_deleted: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// `(status, {"error": message})`
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Every successful response produced by the token endpoints.
#[derive(Debug)]
pub enum AuthResponse {
    Login(LoginResponse),
    Token(TokenResponse),
    Empty,
}

impl IntoResponse for AuthResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Login(body) => (StatusCode::OK, Json(body)).into_response(),
            Self::Token(body) => (StatusCode::OK, Json(body)).into_response(),
            Self::Empty => StatusCode::NO_CONTENT.into_response(),
        }
    }
}
