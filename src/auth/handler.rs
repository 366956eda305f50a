use axum::{extract::State, response::IntoResponse, Form};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::{session::Session, LoginForm, SignupForm},
    db::DbError,
    error::AppError,
    users::{NewUser, User},
};

/// Create an account and log it in
/// POST /signup
pub async fn signup(
    State(pool): State<SqlitePool>,
    mut session: Session,
    Form(payload): Form<SignupForm>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let mut tx = pool.begin().await?;

    let user = User::signup(
        &mut *tx,
        NewUser {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            image_url: payload.image_url,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| match e {
        DbError::Integrity(_) => AppError::Conflict("Username or email already taken".to_string()),
        other => AppError::from(other),
    })?;

    tracing::info!(user_id = %user.id, "user signed up");

    session.log_in(user.id);
    let response = session.redirect(&mut *tx, "/").await?;
    tx.commit().await?;

    Ok(response)
}

/// POST /login
pub async fn login(
    State(pool): State<SqlitePool>,
    mut session: Session,
    Form(payload): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::UnprocessableEntity(e.to_string()))?;

    let mut conn = pool.acquire().await?;

    let user = User::authenticate(&mut conn, &payload.username, &payload.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    tracing::info!(user_id = %user.id, "user logged in");

    session.log_in(user.id);
    session.flash("success", format!("Hello, {}!", user.username));

    Ok(session.redirect(&mut conn, "/").await?)
}

/// POST /logout
pub async fn logout(
    State(pool): State<SqlitePool>,
    mut session: Session,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    session.log_out();
    session.flash("success", "You have successfully logged out.");

    Ok(session.redirect(&mut conn, "/").await?)
}
