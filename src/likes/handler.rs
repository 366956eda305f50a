use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    error::AppError,
    likes::{Like, LikeToggleResponse},
    messages::Message,
};

/// Like or unlike a message
/// POST /like-warble/:id
pub async fn toggle_like(
    State(pool): State<SqlitePool>,
    CurrentUser { user, .. }: CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<LikeToggleResponse>, AppError> {
    let mut tx = pool.begin().await?;

    let message = Message::find(&mut *tx, message_id)
        .await?
        .ok_or(AppError::NotFound("Message not found".to_string()))?;

    // Can't like your own warble
    if message.user_id == user.id {
        return Err(AppError::Forbidden);
    }

    let is_liked = Like::toggle(&mut *tx, user.id, message.id).await?;
    let like_count = message.like_count(&mut *tx).await?;

    tx.commit().await?;

    tracing::info!(message_id = %message.id, user_id = %user.id, is_liked, "like toggled");

    Ok(Json(LikeToggleResponse {
        success: true,
        is_liked,
        like_count,
    }))
}
