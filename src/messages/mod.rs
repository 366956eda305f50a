use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{db::DbError, likes::Like, users::UserResponse};

pub mod handler;

/// Pages show at most this many messages.
pub const PAGE_LIMIT: i64 = 100;

/// Database model for a message ("warble")
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
}

/// A timeline row: the message, its author and whether the viewer likes it
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    pub username: String,
    pub image_url: String,
    pub liked: bool,
}

impl Message {
    pub async fn create(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        text: &str,
    ) -> Result<Message, DbError> {
        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (id, text, timestamp, user_id) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(text)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(message)
    }

    pub async fn find(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Message>, DbError> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(message)
    }

    pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// A user's latest messages, newest first.
    pub async fn for_user(
        conn: &mut SqliteConnection,
        user_id: Uuid,
    ) -> Result<Vec<Message>, DbError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE user_id = ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(PAGE_LIMIT)
        .fetch_all(&mut *conn)
        .await?;
        Ok(messages)
    }

    /// Latest messages by `viewer_id` and everyone they follow.
    pub async fn timeline(
        conn: &mut SqliteConnection,
        viewer_id: Uuid,
    ) -> Result<Vec<TimelineEntry>, DbError> {
        let entries = sqlx::query_as::<_, TimelineEntry>(
            r#"
            SELECT
                m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url,
                EXISTS (
                    SELECT 1 FROM likes l WHERE l.message_id = m.id AND l.user_id = ?1
                ) AS liked
            FROM messages m
            JOIN users u ON m.user_id = u.id
            WHERE m.user_id = ?1
               OR m.user_id IN (
                   SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
               )
            ORDER BY m.timestamp DESC
            LIMIT ?2
            "#,
        )
        .bind(viewer_id)
        .bind(PAGE_LIMIT)
        .fetch_all(&mut *conn)
        .await?;
        Ok(entries)
    }

    pub async fn likes_from_users(&self, conn: &mut SqliteConnection) -> Result<Vec<Like>, DbError> {
        Like::for_message(conn, self.id).await
    }

    pub async fn like_count(&self, conn: &mut SqliteConnection) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE message_id = ?")
            .bind(self.id)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}

/// Form payload for posting a message
#[derive(Debug, Deserialize, Validate)]
pub struct NewMessageForm {
    #[validate(length(
        min = 1,
        max = 140,
        message = "Message must be between 1 and 140 characters"
    ))]
    pub text: String,
}

/// Message detail page
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    #[serde(flatten)]
    pub message: Message,
    pub author: UserResponse,
    pub like_count: i64,
}

/// Home page data. `timeline` is empty for anonymous visitors.
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub user: Option<UserResponse>,
    pub timeline: Vec<TimelineEntry>,
}
