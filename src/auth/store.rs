//! SQLite-backed storage for logins waiting on a verification code

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// A login between `request_code` and `submit_code`
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PendingLogin {
    pub phone_number: String,
    pub phone_code_hash: String,
    pub session_name: String,
    pub login_id: String,
    pub created_at: DateTime<Utc>,
}

/// The `pending_logins` table
#[derive(Clone)]
pub struct PendingLoginStore {
    pool: SqlitePool,
}

impl PendingLoginStore {
    /// Open (or create) the database at `path` and ensure the table exists
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pending_logins (
                phone_number TEXT PRIMARY KEY,
                phone_code_hash TEXT NOT NULL,
                session_name TEXT NOT NULL,
                login_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        debug!(path = %path.display(), "Pending login store ready");
        Ok(Self { pool })
    }

    /// Insert a pending login, replacing any previous one for the same phone
    pub async fn upsert(&self, login: &PendingLogin) -> Result<()> {
        sqlx::query(
            "INSERT INTO pending_logins
                (phone_number, phone_code_hash, session_name, login_id, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(phone_number) DO UPDATE SET
                phone_code_hash = excluded.phone_code_hash,
                session_name = excluded.session_name,
                login_id = excluded.login_id,
                created_at = excluded.created_at",
        )
        .bind(&login.phone_number)
        .bind(&login.phone_code_hash)
        .bind(&login.session_name)
        .bind(&login.login_id)
        .bind(login.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, phone_number: &str) -> Result<Option<PendingLogin>> {
        let login = sqlx::query_as::<_, PendingLogin>(
            "SELECT phone_number, phone_code_hash, session_name, login_id, created_at
             FROM pending_logins WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(login)
    }

    /// Remove the pending login for a phone; returns whether a row existed
    pub async fn delete(&self, phone_number: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_logins WHERE phone_number = ?")
            .bind(phone_number)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
