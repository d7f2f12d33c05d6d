//! API layer
//!
//! HTTP handlers and their routers:
//! - Public: status, register, login, messages, post reads
//! - Session-aware: logout
//! - Login required: user profile, protected, post creation, image upload

mod messages;
pub mod metrics;
mod posts;
mod users;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::auth::{authenticate, require_login};

pub use metrics::metrics_router;

/// Routes that need no session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route(
            "/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route("/posts", get(posts::list_posts))
        .route("/posts/:id", get(posts::get_post))
}

/// Routes behind the authentication middleware
///
/// `/logout` only needs a resolved principal; the rest also require login.
pub fn session_router(state: AppState) -> Router<AppState> {
    let login_required = Router::new()
        .route("/user", get(users::current_user))
        .route("/protected", get(users::protected))
        .route("/posts/new", post(posts::create_post))
        .route("/posts/image/upload", post(posts::upload_image))
        .route_layer(middleware::from_fn(require_login));

    Router::new()
        .route("/logout", post(users::logout))
        .merge(login_required)
        .route_layer(middleware::from_fn_with_state(state, authenticate))
}

async fn status() -> &'static str {
    "Hello World!"
}
