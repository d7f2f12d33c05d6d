//! Account service
//!
//! Registration, login and logout, composed from the user directory, the
//! session store and the password hasher.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::{self, IssuedSession, Principal};
use crate::data::{Database, User};
use crate::error::AppError;
use crate::metrics::{LOGINS_TOTAL, LOGOUTS_TOTAL, REGISTRATIONS_TOTAL};

const MIN_USERNAME_CHARS: usize = 5;
const MAX_USERNAME_CHARS: usize = 50;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email regex is valid");
}

/// Fields submitted at registration
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Check registration fields, reporting the first problem found
pub fn validate_registration(registration: &Registration) -> Result<(), AppError> {
    let username_chars = registration.username.chars().count();

    let problem = if registration.username.is_empty() {
        Some("username is required")
    } else if username_chars > MAX_USERNAME_CHARS {
        Some("username cannot be greater than 50 characters")
    } else if username_chars < MIN_USERNAME_CHARS {
        Some("username cannot be smaller than 5 characters")
    } else if registration.email.is_empty() {
        Some("email is required")
    } else if !EMAIL_REGEX.is_match(&registration.email) {
        Some("invalid email format")
    } else if registration.password.is_empty() {
        Some("password is required")
    } else {
        None
    };

    match problem {
        Some(message) => Err(AppError::Validation(message.to_string())),
        None => Ok(()),
    }
}

/// Outcome of [`AccountService::logout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// The caller had no session; nothing was revoked
    AlreadyLoggedOut,
    /// Every session of the user was revoked
    LoggedOut,
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a new user
    ///
    /// Does not log the user in.
    ///
    /// # Errors
    /// Validation errors for bad fields or a taken username
    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        validate_registration(&registration)?;

        if self.db.username_exists(&registration.username).await? {
            return Err(AppError::Validation("username already in use".to_string()));
        }

        let password_hash = auth::password::hash_password_blocking(registration.password).await?;
        let user = User::new(registration.username, registration.email, password_hash);
        self.db.insert_user(&user).await?;

        REGISTRATIONS_TOTAL.inc();
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Verify credentials and issue a new session
    ///
    /// # Errors
    /// `Unauthorized` for an unknown user or a wrong password
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, IssuedSession), AppError> {
        let Some(user) = self.db.get_user_by_username(username).await? else {
            LOGINS_TOTAL.with_label_values(&["unknown_user"]).inc();
            return Err(AppError::Unauthorized("user not registered".to_string()));
        };

        let verified = auth::password::verify_password_blocking(
            password.to_string(),
            user.password_hash.clone(),
        )
        .await?;
        if !verified {
            LOGINS_TOTAL.with_label_values(&["invalid_password"]).inc();
            tracing::info!(user_id = %user.id, "Login rejected: invalid password");
            return Err(AppError::Unauthorized("invalid password".to_string()));
        }

        let issued = auth::create_session(&self.db, &user.id).await?;

        LOGINS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(user_id = %user.id, "User logged in");

        Ok((user, issued))
    }

    /// Revoke all of the caller's sessions
    pub async fn logout(&self, principal: &Principal) -> Result<LogoutOutcome, AppError> {
        let Some(user) = principal.user() else {
            return Ok(LogoutOutcome::AlreadyLoggedOut);
        };

        auth::invalidate_all(&self.db, &user.id).await?;
        LOGOUTS_TOTAL.inc();

        Ok(LogoutOutcome::LoggedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn validation_message(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    async fn service() -> (AccountService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            Database::connect(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        (AccountService::new(db.clone()), db, temp_dir)
    }

    #[test]
    fn validation_reports_first_problem() {
        assert!(validate_registration(&registration("alice1", "a@b.com", "pw")).is_ok());

        assert_eq!(
            validation_message(validate_registration(&registration("", "", ""))),
            "username is required"
        );
        assert_eq!(
            validation_message(validate_registration(&registration("abcd", "a@b.com", "pw"))),
            "username cannot be smaller than 5 characters"
        );
        assert_eq!(
            validation_message(validate_registration(&registration(
                &"x".repeat(51),
                "a@b.com",
                "pw"
            ))),
            "username cannot be greater than 50 characters"
        );
        assert_eq!(
            validation_message(validate_registration(&registration("alice1", "", "pw"))),
            "email is required"
        );
        assert_eq!(
            validation_message(validate_registration(&registration("alice1", "a@b", "pw"))),
            "invalid email format"
        );
        assert_eq!(
            validation_message(validate_registration(&registration("alice1", "a@b.com", ""))),
            "password is required"
        );
    }

    #[test]
    fn username_length_counts_characters_not_bytes() {
        // 5 characters, 10 bytes
        assert!(validate_registration(&registration("ééééé", "a@b.com", "pw")).is_ok());
        assert!(validate_registration(&registration(&"é".repeat(50), "a@b.com", "pw")).is_ok());
    }

    #[tokio::test]
    async fn register_then_login() {
        let (service, db, _temp_dir) = service().await;

        let user = service
            .register(registration("alice1", "a@b.com", "pw"))
            .await
            .unwrap();
        assert!(db.username_exists("alice1").await.unwrap());
        assert_ne!(user.password_hash, "pw");

        let (logged_in, issued) = service.login("alice1", "pw").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let principal =
            auth::resolve_principal(&db, Some(&issued.session_token), Some(&issued.csrf_token))
                .await
                .unwrap();
        assert_eq!(principal, Principal::Authenticated(logged_in));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let (service, _db, _temp_dir) = service().await;
        service
            .register(registration("alice1", "a@b.com", "pw"))
            .await
            .unwrap();

        let error = service
            .register(registration("alice1", "other@b.com", "pw2"))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(message) if message == "username already in use"));
    }

    #[tokio::test]
    async fn login_failures_are_unauthorized() {
        let (service, _db, _temp_dir) = service().await;
        service
            .register(registration("alice1", "a@b.com", "pw"))
            .await
            .unwrap();

        let unknown = service.login("nobody1", "pw").await.unwrap_err();
        assert!(matches!(unknown, AppError::Unauthorized(message) if message == "user not registered"));

        for wrong in ["", "PW", "pw ", "pw2"] {
            let error = service.login("alice1", wrong).await.unwrap_err();
            assert!(matches!(error, AppError::Unauthorized(message) if message == "invalid password"));
        }
    }

    #[tokio::test]
    async fn logout_revokes_all_sessions() {
        let (service, db, _temp_dir) = service().await;
        service
            .register(registration("alice1", "a@b.com", "pw"))
            .await
            .unwrap();

        let (user, first) = service.login("alice1", "pw").await.unwrap();
        let (_, second) = service.login("alice1", "pw").await.unwrap();
        assert_ne!(first.session_token, second.session_token);

        let outcome = service
            .logout(&Principal::Authenticated(user))
            .await
            .unwrap();
        assert_eq!(outcome, LogoutOutcome::LoggedOut);

        for issued in [first, second] {
            let principal =
                auth::resolve_principal(&db, Some(&issued.session_token), Some(&issued.csrf_token))
                    .await
                    .unwrap();
            assert!(principal.is_anonymous());
        }
    }

    #[tokio::test]
    async fn anonymous_logout_is_a_no_op() {
        let (service, _db, _temp_dir) = service().await;
        let outcome = service.logout(&Principal::Anonymous).await.unwrap();
        assert_eq!(outcome, LogoutOutcome::AlreadyLoggedOut);
    }
}
