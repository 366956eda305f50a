use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::CurrentUser, error::AppError, follows::Follow, users::User};

/// Follow a user
/// POST /users/follow/:id
pub async fn follow_user(
    State(pool): State<SqlitePool>,
    CurrentUser { user, session }: CurrentUser,
    Path(followed_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Can't follow yourself
    if user.id == followed_id {
        return Err(AppError::UnprocessableEntity(
            "You cannot follow yourself".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    User::find(&mut *tx, followed_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if Follow::ensure(&mut *tx, user.id, followed_id).await? {
        tracing::info!(follower = %user.id, followed = %followed_id, "follow created");
    }

    let response = session
        .redirect(&mut *tx, &format!("/users/{}/following", user.id))
        .await?;
    tx.commit().await?;

    Ok(response)
}

/// Stop following a user
/// POST /users/stop-following/:id
pub async fn stop_following(
    State(pool): State<SqlitePool>,
    CurrentUser { user, session }: CurrentUser,
    Path(followed_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    User::find(&mut *tx, followed_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if Follow::delete(&mut *tx, user.id, followed_id).await? {
        tracing::info!(follower = %user.id, followed = %followed_id, "follow removed");
    }

    let response = session
        .redirect(&mut *tx, &format!("/users/{}/following", user.id))
        .await?;
    tx.commit().await?;

    Ok(response)
}
