use crate::api::handlers::{admin, auth, health, types, users};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::create_user,
        users::update_user,
        auth::login,
        auth::refresh,
        auth::revoke,
        admin::reset,
    ),
    components(schemas(
        health::Health,
        types::UserCredentials,
        types::UserResponse,
        types::LoginRequest,
        types::LoginResponse,
        types::TokenResponse,
        types::ResetResponse,
        types::ErrorBody,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "users", description = "Account registration and credential updates"),
        (name = "auth", description = "Login, session refresh and refresh token revocation"),
        (name = "admin", description = "Development-only maintenance"),
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
