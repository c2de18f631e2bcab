//! Long-lived opaque refresh tokens: generation, persistence, lookup and revocation.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::Error;
use crate::storage::TokenStore;

/// Bytes of OS randomness behind every refresh token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Persisted refresh token row.
///
/// Once written, only `revoked_at` ever changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    #[must_use]
    pub fn new(token: String, user_id: Uuid, created_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            token,
            user_id,
            created_at,
            expires_at: created_at + ttl,
            revoked_at: None,
        }
    }

    /// Whether this token may currently be exchanged for a session token.
    ///
    /// Every caller goes through this predicate; nothing else decides usability.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

/// Create a new refresh token from the OS random source.
///
/// # Errors
/// Returns [`Error::Entropy`] if the random source fails.
pub fn generate() -> Result<String, Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| Error::Entropy(err.to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
}

impl RefreshTokenManager {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate and persist a refresh token owned by `user_id`.
    ///
    /// # Errors
    /// Returns [`Error::Entropy`] or [`Error::Store`].
    #[instrument(skip(self))]
    pub async fn issue(&self, user_id: Uuid) -> Result<RefreshTokenRecord, Error> {
        let record = RefreshTokenRecord::new(generate()?, user_id, Utc::now(), self.ttl);
        self.store.insert(&record).await?;
        debug!(expires_at = %record.expires_at, "refresh token issued");
        Ok(record)
    }

    /// Look up a refresh token. Revoked and expired rows are still returned;
    /// check them with [`RefreshTokenRecord::is_usable`].
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when no row matches.
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> Result<RefreshTokenRecord, Error> {
        self.store
            .find_by_token(token)
            .await?
            .ok_or(Error::NotFound)
    }

    /// Revoke a refresh token. Revoking twice keeps the first timestamp.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] when no row matches.
    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<(), Error> {
        if self.store.mark_revoked(token, Utc::now()).await? {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }

    /// Drop every refresh token (administrative reset).
    ///
    /// # Errors
    /// Returns [`Error::Store`] if the store fails.
    pub async fn purge(&self) -> Result<u64, Error> {
        Ok(self.store.delete_all().await?)
    }
}
