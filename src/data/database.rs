//! SQLite database operations
//!
//! All database access goes through this module.
//! Every operation is a single statement; SQLite's statement atomicity is
//! the only concurrency control the session tables need.

use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Keep a row only when exactly one matched.
///
/// Lookups by username, id or token pair are expected to be unique; zero and
/// several matches both mean not found.
fn exactly_one<T>(mut rows: Vec<T>, table: &'static str) -> Option<T> {
    match rows.len() {
        1 => rows.pop(),
        0 => None,
        count => {
            tracing::warn!(table, count, "Lookup matched more than one row; treating as not found");
            None
        }
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the SQLite file and run migrations.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Check whether a username is already registered
    pub async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Get a user by username
    ///
    /// # Returns
    /// The user, or None when zero or several rows match
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let rows = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_all(&self.pool)
            .await?;

        Ok(exactly_one(rows, "users"))
    }

    /// Get a user by ID
    ///
    /// # Returns
    /// The user, or None when zero or several rows match
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let rows = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(exactly_one(rows, "users"))
    }

    /// Insert a new user
    ///
    /// # Errors
    /// A username collision (lost registration race) is reported as a
    /// validation error rather than a database failure.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_error) if db_error.is_unique_violation() => {
                AppError::Validation("username already in use".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(())
    }

    /// Delete a user; sessions and posts go with it
    ///
    /// Account deletion has no endpoint; this backs the cascade tests.
    #[cfg(test)]
    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Store the hashes of a freshly issued session/CSRF token pair
    pub async fn insert_session(
        &self,
        user_id: &str,
        session_token_hash: &str,
        csrf_token_hash: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sessions (user_id, session_token_hash, csrf_token_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(session_token_hash)
        .bind(csrf_token_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find the session whose session AND CSRF hashes both match
    ///
    /// # Returns
    /// The session, or None when zero or several rows match
    pub async fn get_session(
        &self,
        session_token_hash: &str,
        csrf_token_hash: &str,
    ) -> Result<Option<SessionPair>, AppError> {
        let rows = sqlx::query_as::<_, SessionPair>(
            "SELECT * FROM sessions WHERE session_token_hash = ? AND csrf_token_hash = ?",
        )
        .bind(session_token_hash)
        .bind(csrf_token_hash)
        .fetch_all(&self.pool)
        .await?;

        Ok(exactly_one(rows, "sessions"))
    }

    /// Delete every session belonging to a user
    ///
    /// # Returns
    /// Number of sessions revoked
    pub async fn delete_sessions_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Posts
    // =========================================================================

    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, title, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List every post, oldest first, without content
    pub async fn get_post_summaries(&self) -> Result<Vec<PostSummary>, AppError> {
        let posts = sqlx::query_as::<_, PostSummary>(
            "SELECT id, title FROM posts ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, msg, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.msg)
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List every message, oldest first
    pub async fn get_messages(&self) -> Result<Vec<Message>, AppError> {
        let messages =
            sqlx::query_as::<_, Message>("SELECT * FROM messages ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(messages)
    }
}
