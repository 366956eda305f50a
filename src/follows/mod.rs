use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
    db::DbError,
    users::{User, UserResponse},
};

pub mod handler;

/// Database model for a follow relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub user_being_followed_id: Uuid,
    pub user_following_id: Uuid,
}

impl Follow {
    /// Inserts the pair; an existing pair is an integrity error.
    pub async fn create(
        conn: &mut SqliteConnection,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<Follow, DbError> {
        let follow = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (user_being_followed_id, user_following_id)
            VALUES (?, ?)
            RETURNING *
            "#,
        )
        .bind(followed_id)
        .bind(follower_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(follow)
    }

    /// Like [`Follow::create`] but a no-op when already following.
    /// Returns whether a row was inserted.
    pub async fn ensure(
        conn: &mut SqliteConnection,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (user_being_followed_id, user_following_id)
            VALUES (?, ?)
            ON CONFLICT (user_being_followed_id, user_following_id) DO NOTHING
            "#,
        )
        .bind(followed_id)
        .bind(follower_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(
        conn: &mut SqliteConnection,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE user_being_followed_id = ? AND user_following_id = ?",
        )
        .bind(followed_id)
        .bind(follower_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(
        conn: &mut SqliteConnection,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, DbError> {
        let found = sqlx::query(
            "SELECT 1 FROM follows WHERE user_being_followed_id = ? AND user_following_id = ?",
        )
        .bind(followed_id)
        .bind(follower_id)
        .fetch_optional(&mut *conn)
        .await?
        .is_some();
        Ok(found)
    }
}

/// Query parameters for paginated follow lists
#[derive(Debug, Deserialize)]
pub struct FollowListFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FollowListFilter {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// `(limit, offset)` with the limit clamped to `1..=MAX_LIMIT` and the
    /// offset floored at zero.
    pub fn window(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Response for paginated followers/following lists
#[derive(Debug, Serialize)]
pub struct FollowListResponse {
    pub user: UserResponse,
    pub users: Vec<UserResponse>,
    pub total: i64,
    pub has_more: bool,
}

impl FollowListResponse {
    pub fn new(user: User, users: Vec<User>, total: i64, (limit, offset): (i64, i64)) -> Self {
        Self {
            user: UserResponse::from(user),
            users: users.into_iter().map(UserResponse::from).collect(),
            total,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}
