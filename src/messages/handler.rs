use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Form,
};
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{self, session::Session, CurrentUser},
    error::AppError,
    messages::{HomeResponse, Message, MessageResponse, NewMessageForm},
    users::{User, UserResponse},
};

fn message_not_found() -> AppError {
    AppError::NotFound("Message not found".to_string())
}

/// Home page: the timeline for logged-in users, flashes for everyone
/// GET /
pub async fn home(
    State(pool): State<SqlitePool>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let user = match session.user_id() {
        Some(id) => User::find(&mut conn, id).await?,
        None => None,
    };

    let timeline = match &user {
        Some(user) => Message::timeline(&mut conn, user.id).await?,
        None => Vec::new(),
    };

    let response = HomeResponse {
        user: user.map(UserResponse::from),
        timeline,
    };

    Ok(session.render(&mut conn, response).await?)
}

/// Post a message as the logged-in user
/// POST /messages/new
pub async fn create_message(
    State(pool): State<SqlitePool>,
    CurrentUser { user, session }: CurrentUser,
    Form(payload): Form<NewMessageForm>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let mut tx = pool.begin().await?;

    let message = Message::create(&mut *tx, user.id, &payload.text).await?;

    tracing::info!(message_id = %message.id, user_id = %user.id, "message created");

    let response = session
        .redirect(&mut *tx, &format!("/users/{}", user.id))
        .await?;
    tx.commit().await?;

    Ok(response)
}

/// Show a message with its like count
/// GET /messages/:id
pub async fn show_message(
    State(pool): State<SqlitePool>,
    session: Session,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let message = Message::find(&mut conn, message_id)
        .await?
        .ok_or_else(message_not_found)?;
    let author = User::find(&mut conn, message.user_id)
        .await?
        .ok_or_else(message_not_found)?;
    let like_count = message.like_count(&mut conn).await?;

    let response = MessageResponse {
        message,
        author: UserResponse::from(author),
        like_count,
    };

    Ok(session.render(&mut conn, response).await?)
}

/// Delete a message; only its author may
/// POST /messages/:id/delete
pub async fn delete_message(
    State(pool): State<SqlitePool>,
    CurrentUser { user, session }: CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let message = Message::find(&mut *tx, message_id)
        .await?
        .ok_or_else(message_not_found)?;

    if message.user_id != user.id {
        tracing::warn!(message_id = %message.id, user_id = %user.id, "refused message delete");
        let response = auth::access_unauthorized(session, &mut *tx).await?;
        tx.commit().await?;
        return Ok(response);
    }

    Message::delete(&mut *tx, message.id).await?;

    tracing::info!(message_id = %message.id, "message deleted");

    let response = session
        .redirect(&mut *tx, &format!("/users/{}", user.id))
        .await?;
    tx.commit().await?;

    Ok(response)
}
