//! Data models
//!
//! Rust structs representing database rows.
//! Entities use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Parse a client-supplied ID, rejecting anything that is not a ULID
    pub fn parse(s: &str) -> Option<Self> {
        ulid::Ulid::from_string(s)
            .ok()
            .map(|ulid| Self(ulid.to_string()))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new user row with a fresh ID
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new().0,
            username,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A stored login session
///
/// Only the hashes of the session and CSRF tokens are persisted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionPair {
    pub id: i64,
    pub user_id: String,
    pub session_token_hash: String,
    pub csrf_token_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Posts & Messages
// =============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(user_id: String, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new().0,
            user_id,
            title,
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Listing projection of a post
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
}

/// An anonymous message board entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub msg: String,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(msg: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new().0,
            msg,
            created_at: now,
            updated_at: now,
        }
    }
}
