//! Pull credentials out of the `Authorization` header.
//!
//! An absent header, an empty value and a different scheme all map to
//! [`Error::MissingCredential`].

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::Error;

pub const BEARER_SCHEME: &str = "Bearer ";
pub const API_KEY_SCHEME: &str = "ApiKey ";

/// Extract a session or refresh token from `Authorization: Bearer <token>`.
///
/// # Errors
/// Returns [`Error::MissingCredential`] when no usable token is present.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, Error> {
    extract_scheme(headers, BEARER_SCHEME)
}

/// Extract a machine credential from `Authorization: ApiKey <key>`.
///
/// # Errors
/// Returns [`Error::MissingCredential`] when no usable key is present.
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, Error> {
    extract_scheme(headers, API_KEY_SCHEME)
}

fn extract_scheme(headers: &HeaderMap, scheme: &str) -> Result<String, Error> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(Error::MissingCredential)?;

    // Scheme prefixes are case-sensitive.
    let credential = value
        .trim()
        .strip_prefix(scheme)
        .map(str::trim)
        .ok_or(Error::MissingCredential)?;

    if credential.is_empty() {
        Err(Error::MissingCredential)
    } else {
        Ok(credential.to_string())
    }
}
