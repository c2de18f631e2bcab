//! `PostgreSQL` implementation of the user and refresh token stores.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::{TokenStore, UserRecord, UserStore, UserWrite};
use crate::auth::RefreshTokenRecord;

pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

const INSERT_TOKEN_SQL: &str = r"
    INSERT INTO refresh_tokens (token, user_id, created_at, expires_at)
    VALUES ($1, $2, $3, $4)
";

// The first revocation timestamp wins and nothing else on the row changes.
const MARK_REVOKED_SQL: &str = r"
    UPDATE refresh_tokens
    SET revoked_at = COALESCE(revoked_at, $2)
    WHERE token = $1
";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error naming the statement that failed.
    pub async fn apply_schema(&self) -> Result<()> {
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(db_span("DDL", statement))
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        Ok(())
    }
}

fn db_span(operation: &'static str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Split a schema file into individual statements on lines ending with `;`.
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("hashed_password"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn token_from_row(row: &PgRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        token: row.get("token"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        revoked_at: row.get("revoked_at"),
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<()> {
        let query = INSERT_TOKEN_SQL;
        sqlx::query(query)
            .bind(&record.token)
            .bind(record.user_id)
            .bind(record.created_at)
            .bind(record.expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert refresh token")?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        let query = r"
            SELECT token, user_id, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
        ";
        let row = sqlx::query(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup refresh token")?;

        Ok(row.as_ref().map(token_from_row))
    }

    async fn mark_revoked(&self, token: &str, revoked_at: DateTime<Utc>) -> Result<bool> {
        let query = MARK_REVOKED_SQL;
        let result = sqlx::query(query)
            .bind(token)
            .bind(revoked_at)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to revoke refresh token")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        let query = "DELETE FROM refresh_tokens";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete refresh tokens")?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = r"
            SELECT id, email, hashed_password, created_at, updated_at
            FROM users
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<UserWrite> {
        let query = r"
            INSERT INTO users
                (id, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password, created_at, updated_at
        ";
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match row {
            Ok(row) => Ok(UserWrite::Saved(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(UserWrite::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<UserWrite> {
        let query = r"
            UPDATE users
            SET email = $2,
                hashed_password = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, hashed_password, created_at, updated_at
        ";
        let row = sqlx::query(query)
            .bind(id)
            .bind(email)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await;

        match row {
            Ok(Some(row)) => Ok(UserWrite::Saved(user_from_row(&row))),
            Ok(None) => Ok(UserWrite::NotFound),
            Err(err) if is_unique_violation(&err) => Ok(UserWrite::Conflict),
            Err(err) => Err(err).context("failed to update user"),
        }
    }

    async fn delete_all(&self) -> Result<u64> {
        let query = "DELETE FROM users";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete users")?;

        Ok(result.rows_affected())
    }
}
