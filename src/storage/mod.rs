//! Persistence collaborators used by the authentication core and the API.
//!
//! Each operation touches at most one row and is individually atomic at the
//! store level; the core never needs multi-row transactions.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::RefreshTokenRecord;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// User row as far as authentication and the account endpoints care.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of writing a user row.
#[derive(Debug)]
pub enum UserWrite {
    Saved(UserRecord),
    /// The email is already taken by another user.
    Conflict,
    /// The user to update no longer exists.
    NotFound,
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<()>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>>;

    /// Stamp `revoked_at` on the matching row. Returns `false` when no row matched.
    async fn mark_revoked(&self, token: &str, revoked_at: DateTime<Utc>) -> Result<bool>;

    async fn delete_all(&self) -> Result<u64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn create(&self, email: &str, password_hash: &str) -> Result<UserWrite>;

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<UserWrite>;

    /// Delete every user; refresh tokens owned by them go too.
    async fn delete_all(&self) -> Result<u64>;
}
