use std::{str::FromStr, time::Duration};

use sqlx::{
    error::ErrorKind,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    ConnectOptions, SqlitePool,
};
use tracing::info;

use crate::config::settings::Settings;

/// Errors raised by the model layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A write violated a unique, not-null, check or foreign-key constraint.
    #[error("integrity error: {0}")]
    Integrity(String),
    #[error("password hashing failed: {0}")]
    Password(String),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, DbError::Integrity(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return DbError::Integrity(db_err.message().to_string());
                }
                _ => {}
            }
        }
        DbError::Sqlx(e)
    }
}

/// Opens the pool and applies the embedded migrations.
///
/// An in-memory database lives only as long as its connection, so it gets a
/// single connection that is never recycled.
pub async fn connect(settings: &Settings) -> anyhow::Result<SqlitePool> {
    let mut options = SqliteConnectOptions::from_str(&settings.database_url)?
        .foreign_keys(true)
        .create_if_missing(true);
    if !settings.sql_echo {
        options = options.disable_statement_logging();
    }

    let in_memory = settings.database_url.contains(":memory:")
        || settings.database_url.contains("mode=memory");

    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("database connected");

    Ok(pool)
}
