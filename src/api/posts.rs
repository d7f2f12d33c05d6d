//! Post endpoints

use axum::{
    extract::{Host, Multipart, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{EntityId, Post, PostSummary};
use crate::error::AppError;
use crate::metrics::{IMAGE_BYTES_UPLOADED, IMAGE_UPLOADS_TOTAL, POSTS_CREATED_TOTAL};

/// Create post request
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Image upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /posts/new
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    if request.title.is_empty() || request.content.is_empty() {
        return Err(AppError::invalid_request());
    }

    let post = Post::new(user.id, request.title, request.content);
    state.db.insert_post(&post).await?;

    POSTS_CREATED_TOTAL.inc();
    tracing::info!(post_id = %post.id, user_id = %post.user_id, "Post created");

    Ok((StatusCode::CREATED, "successfully created post"))
}

/// GET /posts
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostSummary>>, AppError> {
    let posts = state.db.get_post_summaries().await?;
    Ok(Json(posts))
}

/// GET /posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let id = EntityId::parse(&id).ok_or_else(AppError::invalid_request)?;

    let post = state
        .db
        .get_post(&id.0)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

    Ok(Json(post))
}

/// POST /posts/image/upload
///
/// Accepts a multipart `file` field holding an image.
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Host(host): Host,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload_error = || AppError::Validation("image upload error".to_string());
    let max_size = state.storage.max_upload_bytes();

    let mut file_data: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|_| upload_error())? {
        if field.name() != Some("file") {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|content_type| content_type.starts_with("image/"));
        if !is_image {
            return Err(upload_error());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|_| upload_error())? {
            if bytes.len() + chunk.len() > max_size {
                return Err(AppError::PayloadTooLarge(max_size));
            }
            bytes.extend_from_slice(&chunk);
        }

        file_data = Some(bytes);
        break;
    }

    let data = file_data.ok_or_else(upload_error)?;
    let file_name = state.storage.save(&data).await?;

    IMAGE_UPLOADS_TOTAL.inc();
    IMAGE_BYTES_UPLOADED.inc_by(data.len() as f64);
    tracing::info!(user_id = %user.id, file_name = %file_name, bytes = data.len(), "Image uploaded");

    Ok(Json(UploadResponse {
        url: state
            .storage
            .public_url(&state.config.server.protocol, &host, &file_name),
    }))
}
