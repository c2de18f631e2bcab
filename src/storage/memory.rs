//! In-process store used by tests and local runs without a database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{TokenStore, UserRecord, UserStore, UserWrite};
use crate::auth::RefreshTokenRecord;

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    tokens: HashMap<String, RefreshTokenRecord>,
}

/// Users and refresh tokens behind one lock, so deleting users can drop
/// their tokens in the same step.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.tokens.contains_key(&record.token) {
            anyhow::bail!("refresh token already exists");
        }
        if !state.users.contains_key(&record.user_id) {
            anyhow::bail!("refresh token owner {} does not exist", record.user_id);
        }
        state.tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        Ok(self.state.lock().await.tokens.get(token).cloned())
    }

    async fn mark_revoked(&self, token: &str, revoked_at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.tokens.get_mut(token) {
            Some(record) => {
                record.revoked_at.get_or_insert(revoked_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let removed = state.tokens.len() as u64;
        state.tokens.clear();
        Ok(removed)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<UserWrite> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|user| user.email == email) {
            return Ok(UserWrite::Conflict);
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(UserWrite::Saved(user))
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<UserWrite> {
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|user| user.email == email && user.id != id)
        {
            return Ok(UserWrite::Conflict);
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(UserWrite::NotFound);
        };
        user.email = email.to_string();
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(UserWrite::Saved(user.clone()))
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let removed = state.users.len() as u64;
        state.users.clear();
        state.tokens.clear();
        Ok(removed)
    }
}
