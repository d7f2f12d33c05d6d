//! Authentication middleware
//!
//! `authenticate` resolves a [`Principal`] for every request behind it;
//! `require_login` then rejects anonymous callers.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::session::{Principal, resolve_principal};
use crate::AppState;
use crate::data::User;
use crate::error::AppError;

/// Cookie holding the HttpOnly session token
pub const SESSION_COOKIE: &str = "session_token";
/// Cookie holding the script-readable CSRF token
pub const CSRF_COOKIE: &str = "csrf_token";
/// Header a client may use to echo the CSRF token
pub const CSRF_HEADER: &str = "x-csrf-token";
/// Query/form/JSON field carrying the CSRF token
const CSRF_FIELD: &str = "csrf_token";

#[derive(Debug, Deserialize)]
struct CsrfField {
    csrf_token: Option<String>,
}

fn csrf_from_urlencoded(raw: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(raw)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

fn csrf_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

enum BodyKind {
    Json,
    Form,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        BodyKind::Json
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        BodyKind::Form
    } else {
        BodyKind::Other
    }
}

/// Pull the CSRF token out of the request
///
/// Lookup order: `X-CSRF-Token` header, `csrf_token` query parameter, then a
/// `csrf_token` field in a JSON or urlencoded body. A buffered body is put
/// back so the handler can still extract it.
///
/// `body_limit` must match the router's body limit so that anything the
/// router accepts can be buffered here.
async fn extract_csrf_token(
    request: Request,
    read_timeout: Duration,
    body_limit: usize,
) -> Result<(Request, Option<String>), AppError> {
    if let Some(token) = csrf_from_headers(request.headers()) {
        return Ok((request, Some(token)));
    }

    if let Some(token) = request
        .uri()
        .query()
        .and_then(|query| csrf_from_urlencoded(query.as_bytes()))
    {
        return Ok((request, Some(token)));
    }

    let kind = body_kind(request.headers());
    if matches!(kind, BodyKind::Other) {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = tokio::time::timeout(read_timeout, axum::body::to_bytes(body, body_limit))
        .await
        .map_err(|_| AppError::RequestTimeout)?
        .map_err(|error| {
            tracing::debug!(%error, body_limit, "Failed to buffer request body");
            AppError::PayloadTooLarge(body_limit)
        })?;

    let token = match kind {
        BodyKind::Json => serde_json::from_slice::<CsrfField>(&bytes)
            .ok()
            .and_then(|field| field.csrf_token),
        BodyKind::Form => csrf_from_urlencoded(&bytes),
        BodyKind::Other => None,
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

/// Middleware resolving the caller's identity
///
/// Always continues with a principal attached; only store failures abort
/// the request (500).
///
/// # Usage
/// ```ignore
/// let routes = Router::new()
///     .route("/logout", post(logout))
///     .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));
/// ```
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut request, csrf_token) = extract_csrf_token(
        request,
        state.config.server.read_timeout(),
        state.storage.request_body_limit(),
    )
    .await?;
    let session_token = jar.get(SESSION_COOKIE).map(|cookie| cookie.value());

    let principal = resolve_principal(&state.db, session_token, csrf_token.as_deref()).await?;

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Middleware rejecting anonymous callers
///
/// Must run after [`authenticate`]; a request without a resolved principal
/// is treated as anonymous.
pub async fn require_login(request: Request, next: Next) -> Result<Response, AppError> {
    match request.extensions().get::<Principal>() {
        Some(Principal::Authenticated(_)) => Ok(next.run(request).await),
        _ => Err(AppError::InvalidSession),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    /// Principal attached by `authenticate`, anonymous if none
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Principal>()
            .cloned()
            .unwrap_or(Principal::Anonymous))
    }
}

/// Extractor for the logged-in user
///
/// Use in handlers behind `require_login`.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal>() {
            Some(Principal::Authenticated(user)) => Ok(CurrentUser(user.clone())),
            _ => Err(AppError::InvalidSession),
        }
    }
}
