//! Session management
//!
//! A login issues two independent tokens: the session token (kept by the
//! browser in an HttpOnly cookie) and the CSRF token (script-readable, sent
//! back by the client alongside each request). Only their hashes are stored,
//! and a request is authenticated only when both hashes hit the same row.

use crate::data::{Database, SessionPair, User};
use crate::error::AppError;

use super::token::{TOKEN_BYTES, generate_token, hash_token};

/// Plaintext tokens of a newly created session
///
/// These are handed to the client once and never persisted.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_token: String,
    pub csrf_token: String,
}

/// Identity resolved for the current request
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Anonymous,
    Authenticated(User),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated(user) => Some(user),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Principal::Anonymous => "anonymous",
            Principal::Authenticated(_) => "authenticated",
        }
    }
}

/// Issue a session for `user_id` and store the token hashes
///
/// # Errors
/// Entropy or persistence failures; nothing is stored in that case
pub async fn create_session(db: &Database, user_id: &str) -> Result<IssuedSession, AppError> {
    let session_token = generate_token(TOKEN_BYTES)?;
    let csrf_token = generate_token(TOKEN_BYTES)?;

    db.insert_session(user_id, &hash_token(&session_token), &hash_token(&csrf_token))
        .await?;

    tracing::debug!(user_id, "Session created");

    Ok(IssuedSession {
        session_token,
        csrf_token,
    })
}

/// Find the stored session for a presented token pair
pub async fn lookup_session(
    db: &Database,
    session_token: &str,
    csrf_token: &str,
) -> Result<Option<SessionPair>, AppError> {
    db.get_session(&hash_token(session_token), &hash_token(csrf_token))
        .await
}

/// Revoke every session of a user, on every device
pub async fn invalidate_all(db: &Database, user_id: &str) -> Result<u64, AppError> {
    let revoked = db.delete_sessions_for_user(user_id).await?;
    tracing::info!(user_id, revoked, "Sessions invalidated");
    Ok(revoked)
}

/// Resolve the principal for a presented (session, csrf) token pair
///
/// Missing or empty tokens, unknown pairs and sessions whose user no longer
/// exists all resolve to `Principal::Anonymous`. Only store failures are
/// errors.
pub async fn resolve_principal(
    db: &Database,
    session_token: Option<&str>,
    csrf_token: Option<&str>,
) -> Result<Principal, AppError> {
    let principal = match (session_token, csrf_token) {
        (Some(session_token), Some(csrf_token))
            if !session_token.is_empty() && !csrf_token.is_empty() =>
        {
            match lookup_session(db, session_token, csrf_token).await? {
                Some(session) => match db.get_user_by_id(&session.user_id).await? {
                    Some(user) => Principal::Authenticated(user),
                    None => {
                        tracing::debug!(user_id = %session.user_id, "Session references a missing user");
                        Principal::Anonymous
                    }
                },
                None => Principal::Anonymous,
            }
        }
        _ => Principal::Anonymous,
    };

    crate::metrics::PRINCIPALS_RESOLVED_TOTAL
        .with_label_values(&[principal.kind()])
        .inc();

    Ok(principal)
}
