//! Account endpoints
//!
//! Registration, cookie login/logout and the logged-in user's views.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::{CSRF_COOKIE, CurrentUser, IssuedSession, Principal, SESSION_COOKIE};
use crate::error::AppError;
use crate::service::{AccountService, LogoutOutcome, Registration};

/// Register request
///
/// Missing fields deserialize as empty so validation can name them.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Profile of the logged-in user
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
}

fn session_cookies(state: &AppState, issued: IssuedSession) -> [Cookie<'static>; 2] {
    let auth = &state.config.auth;
    let secure = state.config.should_use_secure_cookies();
    let max_age = time::Duration::seconds(auth.session_max_age);

    let build = |name: &'static str, value: String, http_only: bool| {
        let mut cookie = Cookie::build((name, value))
            .path(auth.cookie_path.clone())
            .http_only(http_only)
            .secure(secure)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build();
        if let Some(domain) = &auth.cookie_domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    };

    [
        build(SESSION_COOKIE, issued.session_token, true),
        build(CSRF_COOKIE, issued.csrf_token, false),
    ]
}

fn removal_cookie(state: &AppState, name: &'static str) -> Cookie<'static> {
    let auth = &state.config.auth;
    let mut cookie = Cookie::build((name, ""))
        .path(auth.cookie_path.clone())
        .build();
    if let Some(domain) = &auth.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie.make_removal();
    cookie
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;

    AccountService::new(state.db.clone())
        .register(Registration {
            username: request.username,
            email: request.email,
            password: request.password,
        })
        .await?;

    Ok((StatusCode::CREATED, "Successfully created user!"))
}

/// POST /login
///
/// Sets the HttpOnly `session_token` cookie and the script-readable
/// `csrf_token` cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    if request.username.is_empty() || request.password.is_empty() {
        return Err(AppError::invalid_request());
    }

    let (_user, issued) = AccountService::new(state.db.clone())
        .login(&request.username, &request.password)
        .await?;

    let [session_cookie, csrf_cookie] = session_cookies(&state, issued);
    let jar = jar.add(session_cookie).add(csrf_cookie);

    Ok((jar, "Login successful!"))
}

/// POST /logout
///
/// Revokes every session of the user, not only the current one.
pub async fn logout(
    State(state): State<AppState>,
    principal: Principal,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let outcome = AccountService::new(state.db.clone())
        .logout(&principal)
        .await?;

    match outcome {
        LogoutOutcome::AlreadyLoggedOut => Ok((jar, "Already not logged in!")),
        LogoutOutcome::LoggedOut => {
            let jar = jar
                .add(removal_cookie(&state, SESSION_COOKIE))
                .add(removal_cookie(&state, CSRF_COOKIE));
            Ok((jar, "Logout successful!"))
        }
    }
}

/// GET /user
pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse {
        username: user.username,
        email: user.email,
    })
}

/// GET /protected
pub async fn protected() -> &'static str {
    "Protected Message"
}
