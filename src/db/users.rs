use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Credential store: one table, username -> password hash. Passwords are
/// stored as hex-encoded unsalted SHA-256, matching the legacy records this
/// store inherits.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl UserStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS users (username TEXT PRIMARY KEY, password TEXT)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a new credential. Returns false when the username is already
    /// taken; the primary-key constraint settles concurrent signups.
    pub async fn create(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?1, ?2)")
            .bind(username)
            .bind(hash_password(password))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// True iff a row exists for the username and the stored hash matches
    /// the hash of the supplied password.
    pub async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT password FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => row.get::<String, _>("password") == hash_password(password),
            None => false,
        })
    }

    #[cfg(test)]
    async fn count(&self, username: &str) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .unwrap()
            .get("n")
    }
}
