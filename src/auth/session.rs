//! Stateless session tokens: compact HS256 JWTs signed with a shared secret.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::Error;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "HS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokenHeader {
    pub alg: String,
    /// Optional in JWT; tokens without it are still accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl SessionTokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value).map_err(|_| Error::Signing)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| Error::Malformed)
}

fn mac(secret: &[u8], signing_input: &str) -> Result<HmacSha256, Error> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::Signing)?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

/// Sign arbitrary session claims.
///
/// # Errors
/// Returns [`Error::Signing`] if the claims cannot be encoded.
pub fn sign(claims: &SessionClaims, secret: &[u8]) -> Result<String, Error> {
    let header_b64 = b64e_json(&SessionTokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signature = mac(secret, &signing_input)?.finalize().into_bytes();
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Issue a session token for `user_id` valid from `now` until `now + ttl`.
///
/// A negative `ttl` produces a token that is already expired.
///
/// # Errors
/// Returns [`Error::Signing`] if the expiry overflows or encoding fails.
pub fn issue(
    user_id: Uuid,
    issuer: &str,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, Error> {
    let expires_at = now.checked_add_signed(ttl).ok_or(Error::Signing)?;
    let claims = SessionClaims {
        iss: issuer.to_string(),
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    sign(&claims, secret)
}

/// Verify a session token and return its decoded claims.
///
/// Checks run in order: shape, header algorithm, signature, claims, expiry.
/// Expiry is only reported for tokens whose signature is valid.
///
/// # Errors
/// - [`Error::Malformed`] for bad structure, base64 or JSON,
/// - [`Error::SignatureInvalid`] for any algorithm other than HS256 or a bad signature,
/// - [`Error::Expired`] when `now >= exp`.
pub fn verify_claims(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<SessionClaims, Error> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(Error::Malformed)?;
    let claims_b64 = parts.next().ok_or(Error::Malformed)?;
    let sig_b64 = parts.next().ok_or(Error::Malformed)?;
    if parts.next().is_some() {
        return Err(Error::Malformed);
    }

    let header: SessionTokenHeader = b64d_json(header_b64)?;
    if header.alg != ALGORITHM {
        return Err(Error::SignatureInvalid);
    }

    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Malformed)?;
    let signing_input = format!("{header_b64}.{claims_b64}");
    mac(secret, &signing_input)?
        .verify_slice(&signature)
        .map_err(|_| Error::SignatureInvalid)?;

    let claims: SessionClaims = b64d_json(claims_b64)?;
    if now.timestamp() >= claims.exp {
        return Err(Error::Expired);
    }

    Ok(claims)
}

/// Verify a session token and return the user id it was issued for.
///
/// # Errors
/// See [`verify_claims`]; additionally [`Error::Malformed`] if the subject is
/// not a UUID.
pub fn verify(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<Uuid, Error> {
    let claims = verify_claims(token, secret, now)?;
    Uuid::parse_str(&claims.sub).map_err(|_| Error::Malformed)
}

/// Session token codec bound to the process-wide signing secret and issuer.
#[derive(Clone)]
pub struct SessionTokenCodec {
    secret: SecretString,
    issuer: String,
}

impl SessionTokenCodec {
    #[must_use]
    pub fn new(secret: SecretString, issuer: String) -> Self {
        Self { secret, issuer }
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// # Errors
    /// See [`issue`].
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, Error> {
        issue(
            user_id,
            &self.issuer,
            self.secret.expose_secret().as_bytes(),
            ttl,
            Utc::now(),
        )
    }

    /// # Errors
    /// See [`verify`].
    pub fn verify(&self, token: &str) -> Result<Uuid, Error> {
        verify(token, self.secret.expose_secret().as_bytes(), Utc::now())
    }
}

impl std::fmt::Debug for SessionTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenCodec")
            .field("secret", &"***")
            .field("issuer", &self.issuer)
            .finish()
    }
}
