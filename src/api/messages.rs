//! Message board endpoints
//!
//! Messages are unowned and need no login.

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::data::Message;
use crate::error::AppError;
use crate::metrics::MESSAGES_CREATED_TOTAL;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse<T> {
    pub message: T,
}

/// GET /messages
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse<Vec<Message>>>, AppError> {
    let messages = state.db.get_messages().await?;
    if messages.is_empty() {
        return Err(AppError::NotFound("no messages".to_string()));
    }

    Ok(Json(MessageResponse { message: messages }))
}

/// POST /messages
pub async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse<Message>>, AppError> {
    let Json(request) = payload?;
    if request.msg.is_empty() {
        return Err(AppError::Validation("invalid create request".to_string()));
    }

    let message = Message::new(request.msg);
    state.db.insert_message(&message).await?;
    MESSAGES_CREATED_TOTAL.inc();

    Ok(Json(MessageResponse { message }))
}
