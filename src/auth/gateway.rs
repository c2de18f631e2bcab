//! Per-request authentication decisions and the login/refresh/revoke flows.
//!
//! Each authenticated request walks the same steps and stops at the first
//! failure:
//!
//! 1. extract the credential from the `Authorization` header,
//! 2. verify it (session token signature and expiry, or refresh token lookup
//!    plus usability),
//! 3. for identity-scoped operations, compare the resolved user against the
//!    resource owner.
//!
//! Failures in steps 1 and 2 become [`Rejection::Unauthorized`], an owner
//! mismatch becomes [`Rejection::Forbidden`]. The underlying [`Error`] kind is
//! kept for logging only.

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use super::{
    credentials::{extract_api_key, extract_bearer},
    password,
    refresh::{RefreshTokenManager, RefreshTokenRecord},
    session::SessionTokenCodec,
    Error,
};
use crate::storage::{TokenStore, UserRecord, UserStore};

const DEFAULT_ISSUER: &str = "chirpy";
const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 60 * 24 * 60 * 60;

#[derive(Clone)]
pub struct AuthConfig {
    token_secret: SecretString,
    api_key: Option<SecretString>,
    issuer: String,
    session_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            api_key: None,
            issuer: DEFAULT_ISSUER.to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
        self.api_key = api_key;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    /// Session lifetime for a login, optionally shortened by the caller.
    ///
    /// Requests that are absent, non-positive or longer than the configured
    /// lifetime get the configured lifetime.
    #[must_use]
    pub fn session_ttl(&self, requested_seconds: Option<i64>) -> Duration {
        let seconds = requested_seconds
            .filter(|&requested| requested > 0 && requested < self.session_ttl_seconds)
            .unwrap_or(self.session_ttl_seconds);
        Duration::seconds(seconds)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"***")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("issuer", &self.issuer)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

/// The user a request was authenticated as. Produced per request, never cached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
}

/// Everything a successful login hands back to the caller.
#[derive(Debug)]
pub struct LoginGrant {
    pub user: UserRecord,
    pub token: String,
    pub refresh: RefreshTokenRecord,
}

#[derive(Debug)]
pub enum Rejection {
    /// Missing, malformed, forged, expired, unknown or revoked credential.
    Unauthorized(Error),
    /// Authenticated, but not the owner of the resource.
    Forbidden,
    /// Store, hashing or signing failure.
    Internal(Error),
}

impl Rejection {
    /// Whether the request failed only because the presented token expired.
    ///
    /// After [`AuthGateway::authenticate`] this means the session token ran out
    /// and the client should refresh. After [`AuthGateway::refresh`] it means
    /// the refresh token ran out and the client must log in again.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Unauthorized(Error::Expired))
    }
}

impl From<Error> for Rejection {
    fn from(err: Error) -> Self {
        if err.is_credential_failure() {
            Self::Unauthorized(err)
        } else {
            Self::Internal(err)
        }
    }
}

pub struct AuthGateway {
    config: AuthConfig,
    codec: SessionTokenCodec,
    refresh: RefreshTokenManager,
    users: Arc<dyn UserStore>,
}

impl AuthGateway {
    #[must_use]
    pub fn new(config: AuthConfig, tokens: Arc<dyn TokenStore>, users: Arc<dyn UserStore>) -> Self {
        let codec = SessionTokenCodec::new(config.token_secret.clone(), config.issuer.clone());
        let refresh = RefreshTokenManager::new(tokens, Duration::seconds(config.refresh_ttl_seconds));
        Self {
            config,
            codec,
            refresh,
            users,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub fn refresh_tokens(&self) -> &RefreshTokenManager {
        &self.refresh
    }

    /// Authenticate a request carrying a session token.
    ///
    /// # Errors
    /// [`Rejection::Unauthorized`] for any credential problem.
    #[instrument(skip_all)]
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, Rejection> {
        let token = extract_bearer(headers).map_err(|err| reject("extract", err))?;
        let user_id = self.codec.verify(&token).map_err(|err| reject("verify", err))?;
        Ok(Identity { user_id })
    }

    /// Allow an identity-scoped operation only for the resource owner.
    ///
    /// # Errors
    /// [`Rejection::Forbidden`] when `identity` is not `owner_id`.
    pub fn authorize_owner(&self, identity: Identity, owner_id: Uuid) -> Result<Identity, Rejection> {
        if identity.user_id == owner_id {
            Ok(identity)
        } else {
            debug!(user_id = %identity.user_id, %owner_id, "ownership mismatch");
            Err(Rejection::Forbidden)
        }
    }

    /// Authenticate a machine caller by `Authorization: ApiKey <key>`.
    ///
    /// Without a configured key every request is rejected.
    ///
    /// # Errors
    /// [`Rejection::Unauthorized`] when the key is missing or wrong.
    pub fn authenticate_api_key(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        let presented = extract_api_key(headers).map_err(|err| reject("extract", err))?;
        let Some(expected) = &self.config.api_key else {
            return Err(reject("verify", Error::NotFound));
        };
        // Compare digests so the comparison time does not depend on the key prefix.
        let presented = Sha256::digest(presented.as_bytes());
        let expected = Sha256::digest(expected.expose_secret().as_bytes());
        if presented == expected {
            Ok(())
        } else {
            Err(reject("verify", Error::Mismatch))
        }
    }

    /// Hash a new password for registration or a credential update.
    ///
    /// # Errors
    /// [`Rejection::Internal`] if hashing fails.
    pub async fn hash_password(&self, plaintext: &str) -> Result<String, Rejection> {
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || password::hash(&plaintext))
            .await
            .map_err(|err| reject("hash", Error::Hashing(err.to_string())))?
            .map_err(|err| reject("hash", err))
    }

    /// Exchange email and password for a session token plus a persisted refresh token.
    ///
    /// An unknown email and a wrong password produce the same rejection.
    ///
    /// # Errors
    /// [`Rejection::Unauthorized`] for bad credentials, [`Rejection::Internal`]
    /// for store, hashing or signing failures.
    #[instrument(skip(self, plaintext))]
    pub async fn login(
        &self,
        email: &str,
        plaintext: &str,
        requested_ttl_seconds: Option<i64>,
    ) -> Result<LoginGrant, Rejection> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(|err| reject("lookup", Error::from(err)))?;

        let plaintext = plaintext.to_string();
        let Some(user) = user else {
            // Same Argon2 cost as a wrong password, so timing does not reveal
            // which emails are registered.
            let outcome =
                tokio::task::spawn_blocking(move || password::verify_absent(&plaintext)).await;
            return Err(match outcome {
                Err(err) => reject("verify", Error::Hashing(err.to_string())),
                Ok(_) => reject("lookup", Error::NotFound),
            });
        };

        let stored = user.password_hash.clone();
        tokio::task::spawn_blocking(move || password::verify(&plaintext, &stored))
            .await
            .map_err(|err| reject("verify", Error::Hashing(err.to_string())))?
            .map_err(|err| reject("verify", err))?;

        let token = self
            .codec
            .issue(user.id, self.config.session_ttl(requested_ttl_seconds))
            .map_err(|err| reject("sign", err))?;
        // Persist the refresh token before anything is returned to the caller.
        let refresh = self
            .refresh
            .issue(user.id)
            .await
            .map_err(|err| reject("persist", err))?;

        debug!(user_id = %user.id, "login succeeded");

        Ok(LoginGrant {
            user,
            token,
            refresh,
        })
    }

    /// Exchange a usable refresh token for a new session token. The refresh
    /// token itself is left untouched.
    ///
    /// # Errors
    /// [`Rejection::Unauthorized`] when the token is missing, unknown, expired or revoked.
    #[instrument(skip_all)]
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, Rejection> {
        let token = extract_bearer(headers).map_err(|err| reject("extract", err))?;
        let record = self
            .refresh
            .resolve(&token)
            .await
            .map_err(|err| reject("resolve", err))?;

        if !record.is_usable(Utc::now()) {
            let err = if record.revoked_at.is_some() {
                Error::Revoked
            } else {
                Error::Expired
            };
            return Err(reject("usable", err));
        }

        self.codec
            .issue(record.user_id, self.config.session_ttl(None))
            .map_err(|err| reject("sign", err))
    }

    /// Revoke the refresh token presented in the `Authorization` header.
    ///
    /// Revoking an expired or already revoked token succeeds.
    ///
    /// # Errors
    /// [`Rejection::Unauthorized`] when the token is missing or unknown.
    #[instrument(skip_all)]
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        let token = extract_bearer(headers).map_err(|err| reject("extract", err))?;
        self.refresh
            .revoke(&token)
            .await
            .map_err(|err| reject("revoke", err))
    }
}

fn reject(stage: &'static str, err: Error) -> Rejection {
    let rejection = Rejection::from(err);
    match &rejection {
        Rejection::Unauthorized(reason) => debug!(stage, %reason, "request rejected"),
        Rejection::Internal(reason) => {
            error!(stage, "authentication failed internally: {reason:#}");
        }
        Rejection::Forbidden => debug!(stage, "request forbidden"),
    }
    rejection
}
