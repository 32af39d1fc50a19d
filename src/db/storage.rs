//! `localStorage`-style accessors over the `local_storage` table.

use std::path::Path;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::init_database;
use crate::errors::AppError;

/// Key of the cookie-consent flag.
pub const COOKIE_CONSENT_KEY: &str = "cookie-consent";

/// Persistent key/value store for the session's browser-side flags.
#[derive(Clone)]
pub struct LocalStorage {
    pool: SqlitePool,
}

impl LocalStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let pool = init_database(path).await?;
        Ok(Self::new(pool))
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The visitor's cookie choice; `None` until they answered the banner.
    pub async fn cookie_consent(&self) -> Result<Option<bool>, AppError> {
        let value = self.get_item(COOKIE_CONSENT_KEY).await?;
        Ok(match value.as_deref() {
            Some("accepted") | Some("true") => Some(true),
            Some("declined") | Some("false") => Some(false),
            Some(other) => {
                tracing::warn!(value = other, "Ignoring unreadable cookie-consent value");
                None
            }
            None => None,
        })
    }

    pub async fn set_cookie_consent(&self, accepted: bool) -> Result<(), AppError> {
        let value = if accepted { "accepted" } else { "declined" };
        self.set_item(COOKIE_CONSENT_KEY, value).await
    }
}
