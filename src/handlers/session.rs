use axum::http::HeaderMap;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::User;
use crate::services::identity::{AuthFlow, IdentityError, IdentityErrorKind, VerifiedIdentity};
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the bearer token to an identity without touching the database.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<VerifiedIdentity, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;

    state.identity.verify_token(token).await.map_err(|e| match e.kind {
        IdentityErrorKind::Transport => AppError::Identity(e.message),
        _ => {
            tracing::debug!(code = %e.code, "rejected session token");
            AppError::Unauthorized
        }
    })
}

/// The signed-in user's stored profile.
pub async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let identity = authenticate(state, headers).await?;

    let db = state.conn()?;
    queries::get_user(&db, &identity.uid)?
        .ok_or_else(|| AppError::NotFound("user profile".to_string()))
}

/// Admin rights need the configured email and proof that the caller owns it.
pub fn is_admin(state: &AppState, identity: &VerifiedIdentity) -> bool {
    identity.email_verified && state.config.is_admin_email(&identity.email)
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<VerifiedIdentity, AppError> {
    let identity = authenticate(state, headers).await?;
    if !is_admin(state, &identity) {
        tracing::warn!(uid = %identity.uid, "non-admin attempted admin access");
        return Err(AppError::Forbidden("admin only".to_string()));
    }
    Ok(identity)
}

/// Maps an identity-service failure onto the response the caller sees.
pub fn identity_failure(err: IdentityError, flow: AuthFlow) -> AppError {
    match (err.kind, flow) {
        (IdentityErrorKind::Transport, _) => AppError::Identity(err.message),
        (_, AuthFlow::SignUp) => AppError::Validation(err.user_message(flow)),
        _ => AppError::Auth(err.user_message(flow)),
    }
}
