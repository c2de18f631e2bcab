//! # Chirpy
//!
//! JSON API for a short-form posting service. The interesting part of the
//! crate is the authentication core in [`auth`]:
//!
//! - **Passwords** are hashed with Argon2id into self-describing PHC strings.
//! - **Session tokens** are HS256-signed, stateless assertions binding a user id,
//!   an issuer, the issue time and an expiry. They are never stored.
//! - **Refresh tokens** are 256-bit random opaque strings persisted with an owner
//!   and an expiry. They can be exchanged for new session tokens until they expire
//!   or are revoked.
//!
//! The HTTP layer in [`api`] only extracts request data and asks the
//! [`auth::AuthGateway`] for a decision. Persistence lives behind the
//! [`storage::TokenStore`] and [`storage::UserStore`] traits.

pub mod api;
pub mod auth;
pub mod cli;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
