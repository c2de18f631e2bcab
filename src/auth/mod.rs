//! Authentication core.
//!
//! - [`password`]: Argon2id hashing and verification of user passwords.
//! - [`session`]: short-lived HS256 session tokens, verified without storage.
//! - [`refresh`]: long-lived opaque refresh tokens, persisted and revocable.
//! - [`credentials`]: `Authorization` header parsing.
//! - [`gateway`]: the per-request decision pipeline the HTTP layer calls into.
//!
//! Configuration (secret, issuer, lifetimes) is passed in at construction;
//! nothing here reads the environment.

pub mod credentials;
mod error;
pub mod gateway;
pub mod password;
pub mod refresh;
pub mod session;

pub use error::Error;
pub use gateway::{AuthConfig, AuthGateway, Identity, LoginGrant, Rejection};
pub use refresh::{RefreshTokenManager, RefreshTokenRecord};
pub use session::SessionTokenCodec;
