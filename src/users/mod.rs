use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use uuid::Uuid;
use validator::Validate;

use crate::{auth::utils, db::DbError, messages::Message};

pub mod handler;

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Database model for a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

/// Column values for a new user row. `password` is written as given;
/// [`User::signup`] is the entry point that hashes it first.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Editable profile fields
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Follower, following and like counts shown on a profile
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserStats {
    pub messages: i64,
    pub followers: i64,
    pub following: i64,
    pub likes: i64,
}

fn or_default(value: Option<&str>, default: &'static str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl User {
    pub async fn create(conn: &mut SqliteConnection, new: &NewUser) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, image_url, header_image_url, bio, location, password)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.username)
        .bind(or_default(new.image_url.as_deref(), DEFAULT_IMAGE_URL))
        .bind(or_default(
            new.header_image_url.as_deref(),
            DEFAULT_HEADER_IMAGE_URL,
        ))
        .bind(&new.bio)
        .bind(&new.location)
        .bind(&new.password)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Hashes `new.password` with argon2 and inserts the user.
    pub async fn signup(conn: &mut SqliteConnection, new: NewUser) -> Result<User, DbError> {
        let password = utils::hash_password(&new.password)?;

        User::create(conn, &NewUser { password, ..new }).await
    }

    /// Returns the user only when the username exists and the password
    /// matches its stored hash.
    pub async fn authenticate(
        conn: &mut SqliteConnection,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, DbError> {
        let Some(user) = User::find_by_username(conn, username).await? else {
            return Ok(None);
        };

        if utils::verify_password(&user.password, password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn find(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(user)
    }

    /// Users whose username contains `q`; everyone when `q` is empty.
    pub async fn search(conn: &mut SqliteConnection, q: Option<&str>) -> Result<Vec<User>, DbError> {
        let pattern = match q.map(str::trim) {
            Some(q) if !q.is_empty() => format!("%{}%", q),
            _ => "%".to_string(),
        };

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username LIKE ? ORDER BY username",
        )
        .bind(pattern)
        .fetch_all(&mut *conn)
        .await?;
        Ok(users)
    }

    pub async fn update_profile(
        conn: &mut SqliteConnection,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = ?, email = ?, image_url = ?, header_image_url = ?, bio = ?, location = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&update.username)
        .bind(&update.email)
        .bind(or_default(update.image_url.as_deref(), DEFAULT_IMAGE_URL))
        .bind(or_default(
            update.header_image_url.as_deref(),
            DEFAULT_HEADER_IMAGE_URL,
        ))
        .bind(&update.bio)
        .bind(&update.location)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    /// Deletes the user; messages, follows and likes go with it.
    pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Users following this user, by username
    pub async fn followers(
        &self,
        conn: &mut SqliteConnection,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM follows f
            JOIN users u ON f.user_following_id = u.id
            WHERE f.user_being_followed_id = ?
            ORDER BY u.username
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(self.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;
        Ok(users)
    }

    /// Users this user follows, by username
    pub async fn following(
        &self,
        conn: &mut SqliteConnection,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM follows f
            JOIN users u ON f.user_being_followed_id = u.id
            WHERE f.user_following_id = ?
            ORDER BY u.username
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(self.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;
        Ok(users)
    }

    pub async fn is_following(
        &self,
        conn: &mut SqliteConnection,
        other: &User,
    ) -> Result<bool, DbError> {
        crate::follows::Follow::exists(conn, self.id, other.id).await
    }

    pub async fn is_followed_by(
        &self,
        conn: &mut SqliteConnection,
        other: &User,
    ) -> Result<bool, DbError> {
        crate::follows::Follow::exists(conn, other.id, self.id).await
    }

    pub async fn messages(&self, conn: &mut SqliteConnection) -> Result<Vec<Message>, DbError> {
        Message::for_user(conn, self.id).await
    }

    pub async fn liked_messages(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<Message>, DbError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT m.* FROM likes l
            JOIN messages m ON l.message_id = m.id
            WHERE l.user_id = ?
            ORDER BY m.timestamp DESC
            "#,
        )
        .bind(self.id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(messages)
    }

    pub async fn likes_message(
        &self,
        conn: &mut SqliteConnection,
        message_id: Uuid,
    ) -> Result<bool, DbError> {
        crate::likes::Like::exists(conn, self.id, message_id).await
    }

    pub async fn stats(&self, conn: &mut SqliteConnection) -> Result<UserStats, DbError> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM messages WHERE user_id = ?1) AS messages,
                (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1) AS followers,
                (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1) AS following,
                (SELECT COUNT(*) FROM likes WHERE user_id = ?1) AS likes
            "#,
        )
        .bind(self.id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(stats)
    }
}

/// Query parameters for the user search page
#[derive(Debug, Deserialize)]
pub struct UserSearch {
    pub q: Option<String>,
}

/// Form payload for editing the logged-in user's profile
#[derive(Debug, Deserialize, Validate)]
pub struct EditProfileForm {
    #[validate(length(
        min = 1,
        max = 30,
        message = "Username must be between 1 and 30 characters"
    ))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// Current password, required to confirm the change
    pub password: String,
}

/// Public view of a user
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            image_url: user.image_url,
            header_image_url: user.header_image_url,
            bio: user.bio,
            location: user.location,
        }
    }
}

/// Profile page: the user, their counts and latest messages
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub stats: UserStats,
    pub is_following: bool,
    pub messages: Vec<Message>,
}

/// Messages a user has liked
#[derive(Debug, Serialize)]
pub struct LikesResponse {
    pub user: UserResponse,
    pub messages: Vec<Message>,
}
