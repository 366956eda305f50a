use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, Rng};

use crate::db::DbError;

const SESSION_ID_LEN: usize = 48;

fn password_error(e: password_hash::Error) -> DbError {
    DbError::Password(e.to_string())
}

/// Salted argon2 hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(password_error)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on a mismatch; a stored hash that does not parse is an error.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, DbError> {
    let parsed = PasswordHash::new(hash).map_err(password_error)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(password_error(e)),
    }
}

pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}
