use thiserror::Error;

/// Failure kinds produced by the authentication primitives.
///
/// The distinctions exist for logging and for the refresh-vs-reject decision.
/// They are collapsed by [`super::Rejection`] before anything reaches a client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing credential")]
    MissingCredential,
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("record not found")]
    NotFound,
    #[error("token revoked")]
    Revoked,
    #[error("password does not match")]
    Mismatch,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token signing failed")]
    Signing,
    #[error("random source failed: {0}")]
    Entropy(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl Error {
    /// True for failures caused by the presented credential rather than by
    /// the service itself.
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential
                | Self::Malformed
                | Self::SignatureInvalid
                | Self::Expired
                | Self::NotFound
                | Self::Revoked
                | Self::Mismatch
        )
    }
}
