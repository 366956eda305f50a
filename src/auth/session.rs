use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    auth::utils, config::settings::Settings, db::DbError, error::AppError, response::ApiResponse,
};

/// Session key holding the logged-in user's id.
pub const CURR_USER_KEY: &str = "curr_user";
pub const SESSION_COOKIE: &str = "warbler_session";
const FLASHES_KEY: &str = "_flashes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

/// Server-side session. The cookie carries only the signed session id; the
/// key/value data lives in the `sessions` table.
pub struct Session {
    id: String,
    data: Map<String, Value>,
    ttl: chrono::Duration,
    jar: SignedCookieJar,
    is_new: bool,
    dirty: bool,
    /// Row left behind when the id was rotated; deleted on save.
    replaced: Option<String>,
}

impl Session {
    fn fresh(jar: SignedCookieJar, ttl: chrono::Duration) -> Self {
        Self {
            id: utils::generate_session_id(),
            data: Map::new(),
            ttl,
            jar,
            is_new: true,
            dirty: false,
            replaced: None,
        }
    }

    /// Loads the session named by the cookie, or starts an empty one when the
    /// cookie is missing, tampered with, unknown or expired.
    pub async fn load(
        jar: SignedCookieJar,
        conn: &mut SqliteConnection,
        ttl: chrono::Duration,
    ) -> Result<Self, DbError> {
        let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(Self::fresh(jar, ttl));
        };

        let row = sqlx::query_scalar::<_, String>(
            "SELECT data FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(&id)
        .bind(Utc::now().timestamp())
        .fetch_optional(&mut *conn)
        .await?;

        let data = match row.map(|raw| serde_json::from_str::<Map<String, Value>>(&raw)) {
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                tracing::warn!("discarding unreadable session data: {}", e);
                return Ok(Self::fresh(jar, ttl));
            }
            None => return Ok(Self::fresh(jar, ttl)),
        };

        Ok(Self {
            id,
            data,
            ttl,
            jar,
            is_new: false,
            dirty: false,
            replaced: None,
        })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.data
            .get(CURR_USER_KEY)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Stores the user and moves the session to a new id, so a cookie
    /// obtained before login never becomes an authenticated one.
    pub fn log_in(&mut self, user_id: Uuid) {
        if !self.is_new {
            let old = std::mem::replace(&mut self.id, utils::generate_session_id());
            self.replaced = Some(old);
            self.is_new = true;
        }
        self.data
            .insert(CURR_USER_KEY.to_string(), Value::String(user_id.to_string()));
        self.dirty = true;
    }

    pub fn log_out(&mut self) {
        if self.data.remove(CURR_USER_KEY).is_some() {
            self.dirty = true;
        }
    }

    pub fn flash(&mut self, category: &str, message: impl Into<String>) {
        let message: String = message.into();
        let flash = serde_json::json!({
            "category": category,
            "message": message,
        });
        let entry = self
            .data
            .entry(FLASHES_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(flash),
            other => *other = Value::Array(vec![flash]),
        }
        self.dirty = true;
    }

    /// Removes and returns the queued flashes.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        match self.data.remove(FLASHES_KEY) {
            Some(value) => {
                self.dirty = true;
                serde_json::from_value(value).unwrap_or_default()
            }
            None => Vec::new(),
        }
    }

    /// Persists the session if it changed and returns the jar to attach to
    /// the response. A new session only gets a cookie once it holds data.
    pub async fn save(self, conn: &mut SqliteConnection) -> Result<SignedCookieJar, DbError> {
        if !self.dirty {
            return Ok(self.jar);
        }

        let now = Utc::now().timestamp();
        let expires_at = now + self.ttl.num_seconds();

        if let Some(old) = &self.replaced {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(old)
                .execute(&mut *conn)
                .await?;
        }

        if self.is_new {
            sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
                .bind(now)
                .execute(&mut *conn)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at
            "#,
        )
        .bind(&self.id)
        .bind(Value::Object(self.data).to_string())
        .bind(expires_at)
        .execute(&mut *conn)
        .await?;

        if !self.is_new {
            return Ok(self.jar);
        }

        let cookie = Cookie::build((SESSION_COOKIE, self.id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);

        Ok(self.jar.add(cookie))
    }

    /// Renders `data` as a page carrying the pending flashes.
    pub async fn render<T: Serialize>(
        mut self,
        conn: &mut SqliteConnection,
        data: T,
    ) -> Result<(SignedCookieJar, ApiResponse<T>), DbError> {
        let flashes = self.take_flashes();
        let jar = self.save(conn).await?;
        Ok((jar, ApiResponse::success(data).with_flashes(flashes)))
    }

    pub async fn redirect(
        self,
        conn: &mut SqliteConnection,
        to: &str,
    ) -> Result<(SignedCookieJar, Redirect), DbError> {
        let jar = self.save(conn).await?;
        Ok((jar, Redirect::to(to)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
    Settings: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = match SignedCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };

        let pool = SqlitePool::from_ref(state);
        let settings = Settings::from_ref(state);

        let mut conn = pool.acquire().await?;
        let session = Session::load(jar, &mut conn, settings.session_ttl).await?;

        Ok(session)
    }
}
