use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Role, User};

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("user not found")]
    NotFound,

    #[error("user is not a washer")]
    NotAWasher,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

fn load_washer(conn: &Connection, user_id: &str) -> Result<User, VerificationError> {
    let user = queries::get_user(conn, user_id)?.ok_or(VerificationError::NotFound)?;
    if user.role != Role::Washer {
        return Err(VerificationError::NotAWasher);
    }
    Ok(user)
}

/// Marks a washer as verified. Repeating the call is harmless: the washer
/// stays verified and keeps the first `verified_at`.
pub fn verify_washer(
    conn: &Connection,
    user_id: &str,
    now: &NaiveDateTime,
) -> Result<User, VerificationError> {
    let before = load_washer(conn, user_id)?;
    let already = before.is_verified_washer();

    queries::set_washer_verified(conn, user_id, true, now)?;

    if already {
        tracing::info!(user_id, "washer already verified");
    } else {
        tracing::info!(user_id, "washer verified");
    }

    load_washer(conn, user_id)
}

pub fn revoke_washer(conn: &Connection, user_id: &str) -> Result<User, VerificationError> {
    load_washer(conn, user_id)?;
    queries::set_washer_verified(conn, user_id, false, &chrono::Utc::now().naive_utc())?;
    tracing::warn!(user_id, "washer verification revoked");
    load_washer(conn, user_id)
}
