use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod follows;
pub mod likes;
pub mod messages;
pub mod response;
pub mod users;

use config::settings::Settings;
use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    settings: Settings,
    cookie_key: Key,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> SqlitePool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Settings {
    fn from_ref(app_state: &AppState) -> Settings {
        app_state.settings.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(app_state: &AppState) -> Key {
        app_state.cookie_key.clone()
    }
}

impl AppState {
    /// Connects the database, runs migrations and derives the cookie key.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let pool = db::connect(&settings).await?;
        let cookie_key = cookie_key(&settings.secret_key);
        Ok(Self {
            pool,
            settings,
            cookie_key,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Signing keys need 64 bytes; SHA-512 stretches any secret to that.
fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(&digest[..])
}

pub fn router(state: AppState) -> Router {
    let auth_router = Router::new()
        .route("/signup", post(auth::handler::signup))
        .route("/login", post(auth::handler::login))
        .route("/logout", post(auth::handler::logout));

    let user_router = Router::new()
        .route("/", get(users::handler::list_users))
        .route("/profile", post(users::handler::edit_profile))
        .route("/follow/:id", post(follows::handler::follow_user))
        .route("/stop-following/:id", post(follows::handler::stop_following))
        .route("/:id", get(users::handler::show_user))
        .route("/:id/following", get(users::handler::show_following))
        .route("/:id/followers", get(users::handler::show_followers))
        .route("/:id/likes", get(users::handler::show_likes));

    let message_router = Router::new()
        .route("/new", post(messages::handler::create_message))
        .route("/:id", get(messages::handler::show_message))
        .route("/:id/delete", post(messages::handler::delete_message));

    Router::new()
        .route("/", get(messages::handler::home))
        .merge(auth_router)
        .nest("/users", user_router)
        .nest("/messages", message_router)
        .route("/like-warble/:id", post(likes::handler::toggle_like))
        .fallback(|| async { AppError::NotFound("Page not found".to_string()) })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
