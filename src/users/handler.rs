use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Form,
};
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{session::Session, CurrentUser},
    db::DbError,
    error::AppError,
    follows::{FollowListFilter, FollowListResponse},
    users::{
        EditProfileForm, LikesResponse, ProfileResponse, ProfileUpdate, User, UserResponse,
        UserSearch,
    },
};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Search users by username
/// GET /users?q=
pub async fn list_users(
    State(pool): State<SqlitePool>,
    session: Session,
    Query(search): Query<UserSearch>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let users: Vec<UserResponse> = User::search(&mut conn, search.q.as_deref())
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(session.render(&mut conn, users).await?)
}

/// Profile page
/// GET /users/:id
pub async fn show_user(
    State(pool): State<SqlitePool>,
    CurrentUser {
        user: viewer,
        session,
    }: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let user = User::find(&mut conn, user_id)
        .await?
        .ok_or_else(user_not_found)?;

    let stats = user.stats(&mut conn).await?;
    let messages = user.messages(&mut conn).await?;
    let is_following = viewer.is_following(&mut conn, &user).await?;

    let profile = ProfileResponse {
        user: UserResponse::from(user),
        stats,
        is_following,
        messages,
    };

    Ok(session.render(&mut conn, profile).await?)
}

/// Users a user follows
/// GET /users/:id/following
pub async fn show_following(
    State(pool): State<SqlitePool>,
    CurrentUser { session, .. }: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(filter): Query<FollowListFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let user = User::find(&mut conn, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    let total = user.stats(&mut conn).await?.following;

    let (limit, offset) = filter.window();
    let following = user.following(&mut conn, limit, offset).await?;

    let response = FollowListResponse::new(user, following, total, (limit, offset));
    Ok(session.render(&mut conn, response).await?)
}

/// Users following a user
/// GET /users/:id/followers
pub async fn show_followers(
    State(pool): State<SqlitePool>,
    CurrentUser { session, .. }: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(filter): Query<FollowListFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let user = User::find(&mut conn, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    let total = user.stats(&mut conn).await?.followers;

    let (limit, offset) = filter.window();
    let followers = user.followers(&mut conn, limit, offset).await?;

    let response = FollowListResponse::new(user, followers, total, (limit, offset));
    Ok(session.render(&mut conn, response).await?)
}

/// Messages a user has liked
/// GET /users/:id/likes
pub async fn show_likes(
    State(pool): State<SqlitePool>,
    CurrentUser { session, .. }: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let user = User::find(&mut conn, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    let messages = user.liked_messages(&mut conn).await?;

    let response = LikesResponse {
        user: UserResponse::from(user),
        messages,
    };

    Ok(session.render(&mut conn, response).await?)
}

/// Edit the logged-in user's profile; the current password confirms it
/// POST /users/profile
pub async fn edit_profile(
    State(pool): State<SqlitePool>,
    CurrentUser { user, mut session }: CurrentUser,
    Form(payload): Form<EditProfileForm>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let mut tx = pool.begin().await?;

    User::authenticate(&mut *tx, &user.username, &payload.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let update = ProfileUpdate {
        username: payload.username,
        email: payload.email,
        image_url: non_blank(payload.image_url),
        header_image_url: non_blank(payload.header_image_url),
        bio: non_blank(payload.bio),
        location: non_blank(payload.location),
    };

    let updated = User::update_profile(&mut *tx, user.id, &update)
        .await
        .map_err(|e| match e {
            DbError::Integrity(_) => {
                AppError::Conflict("Username or email already taken".to_string())
            }
            other => AppError::from(other),
        })?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %updated.id, "profile updated");

    session.flash("success", "Profile updated.");
    let response = session
        .redirect(&mut *tx, &format!("/users/{}", updated.id))
        .await?;
    tx.commit().await?;

    Ok(response)
}
