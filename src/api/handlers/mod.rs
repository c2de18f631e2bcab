pub mod admin;
pub mod auth;
pub mod health;
pub mod types;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use regex::Regex;

use crate::auth::Rejection;
use types::error_response;

// common functions for the handlers

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Clients only ever see the category of a rejection, never its reason.
impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized(_) => error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden => error_response(StatusCode::FORBIDDEN, "forbidden"),
            Self::Internal(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Error;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("a@example"));
        assert!(!valid_email("not an email"));
        assert!(!valid_email(""));
    }

    #[test]
    fn rejection_status_codes() {
        let cases = [
            (Rejection::Unauthorized(Error::Expired), StatusCode::UNAUTHORIZED),
            (Rejection::Unauthorized(Error::MissingCredential), StatusCode::UNAUTHORIZED),
            (Rejection::Forbidden, StatusCode::FORBIDDEN),
            (
                Rejection::Internal(Error::Signing),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (rejection, status) in cases {
            assert_eq!(rejection.into_response().status(), status);
        }
    }
}
