//! Salted, adaptive one-way password hashing (Argon2id, PHC string format).

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};
use std::sync::LazyLock;

use super::Error;

/// Hash a password with a fresh random salt and the default Argon2id cost.
///
/// The result encodes algorithm, version, cost parameters, salt and digest,
/// e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`.
///
/// # Errors
/// Returns [`Error::Hashing`] if the OS entropy source fails.
pub fn hash(password: &str) -> Result<String, Error> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| Error::Hashing(err.to_string()))?;
    let salt = SaltString::encode_b64(&bytes).map_err(|err| Error::Hashing(err.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::Hashing(err.to_string()))
}

/// Check a password against a stored hash.
///
/// Parameters and salt come from the stored hash itself. A corrupt hash and a
/// wrong password both yield [`Error::Mismatch`].
///
/// # Errors
/// Returns [`Error::Mismatch`] when the password does not match.
pub fn verify(password: &str, stored: &str) -> Result<(), Error> {
    let parsed = PasswordHash::new(stored).map_err(|_| Error::Mismatch)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| Error::Mismatch)
}

/// Stand-in hash for logins naming an account that does not exist.
static ABSENT_USER_HASH: LazyLock<Option<String>> = LazyLock::new(|| hash("absent-user").ok());

/// Do the same Argon2 work as [`verify`] for an account that does not exist,
/// then fail. Keeps unknown-email logins as slow as wrong-password logins.
///
/// # Errors
/// Always returns [`Error::Mismatch`].
pub fn verify_absent(password: &str) -> Result<(), Error> {
    if let Some(stored) = ABSENT_USER_HASH.as_deref() {
        let _ = verify(password, stored);
    }
    Err(Error::Mismatch)
}
