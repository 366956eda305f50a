use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use validator::Validate;

use crate::{config::settings::Settings, error::AppError, users::User};

pub mod handler;
pub mod session;
pub mod utils;

use session::Session;

pub const ACCESS_UNAUTHORIZED: &str = "Access unauthorized.";

#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(length(
        min = 1,
        max = 30,
        message = "Username must be between 1 and 30 characters"
    ))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// The logged-in user of a request, with the session that named them.
///
/// Extraction fails for anonymous requests and for sessions pointing at a
/// user that no longer exists; the rejection flashes "Access unauthorized."
/// and redirects home.
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

/// Flashes the unauthorized notice and redirects home.
pub async fn access_unauthorized(
    mut session: Session,
    conn: &mut SqliteConnection,
) -> Result<(SignedCookieJar, Redirect), AppError> {
    session.flash("danger", ACCESS_UNAUTHORIZED);
    Ok(session.redirect(conn, "/").await?)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
    Settings: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let mut session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let pool = SqlitePool::from_ref(state);
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        if let Some(user_id) = session.user_id() {
            let user = User::find(&mut conn, user_id)
                .await
                .map_err(|e| AppError::from(e).into_response())?;
            match user {
                Some(user) => return Ok(CurrentUser { user, session }),
                None => {
                    tracing::debug!("session names missing user {}", user_id);
                    session.log_out();
                }
            }
        }

        let rejection = access_unauthorized(session, &mut conn).await;
        Err(rejection.into_response())
    }
}
