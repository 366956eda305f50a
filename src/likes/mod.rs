use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::db::DbError;

pub mod handler;

/// Database model for a like. A user likes a message at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub user_id: Uuid,
    pub message_id: Uuid,
}

impl Like {
    pub async fn create(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<Like, DbError> {
        let like = sqlx::query_as::<_, Like>(
            "INSERT INTO likes (user_id, message_id) VALUES (?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(message_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(like)
    }

    pub async fn delete(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND message_id = ?")
            .bind(user_id)
            .bind(message_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<bool, DbError> {
        let found = sqlx::query("SELECT 1 FROM likes WHERE user_id = ? AND message_id = ?")
            .bind(user_id)
            .bind(message_id)
            .fetch_optional(&mut *conn)
            .await?
            .is_some();
        Ok(found)
    }

    /// Flips the like and returns whether the message is now liked.
    /// Run it inside a transaction.
    pub async fn toggle(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<bool, DbError> {
        if Like::delete(conn, user_id, message_id).await? {
            return Ok(false);
        }
        Like::create(conn, user_id, message_id).await?;
        Ok(true)
    }

    pub async fn for_message(
        conn: &mut SqliteConnection,
        message_id: Uuid,
    ) -> Result<Vec<Like>, DbError> {
        let likes = sqlx::query_as::<_, Like>("SELECT * FROM likes WHERE message_id = ?")
            .bind(message_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(likes)
    }
}

/// Response for the like toggle
#[derive(Debug, Serialize)]
pub struct LikeToggleResponse {
    pub success: bool,
    #[serde(rename = "isLiked")]
    pub is_liked: bool,
    pub like_count: i64,
}
