//! Session authentication
//!
//! Handles:
//! - Password hashing
//! - Session/CSRF token issuance and lookup
//! - Authentication middleware

mod middleware;
pub mod password;
pub mod session;
pub mod token;

pub use middleware::{
    CSRF_COOKIE, CSRF_HEADER, CurrentUser, SESSION_COOKIE, authenticate, require_login,
};
pub use session::{IssuedSession, Principal, create_session, invalidate_all, resolve_principal};
