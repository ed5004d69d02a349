use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::session::current_user;
use crate::models::{Job, Role, User};
use crate::services::stats::{self, OwnerStats, WasherStats};
use crate::state::AppState;

/// Body shape depends on the caller's role.
#[derive(Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DashboardResponse {
    Owner {
        user: User,
        stats: OwnerStats,
        jobs: Vec<Job>,
    },
    Washer {
        user: User,
        stats: WasherStats,
        jobs: Vec<Job>,
    },
}

// GET /api/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    let user = current_user(&state, &headers).await?;

    let db = state.conn()?;
    let response = match user.role {
        Role::Washer => {
            let jobs = queries::list_jobs_for_washer(&db, &user.id)?;
            let stats = stats::washer_stats(&jobs, user.washer_profile.as_ref());
            DashboardResponse::Washer { user, stats, jobs }
        }
        Role::Owner => {
            let jobs = queries::list_jobs_for_owner(&db, &user.id)?;
            let stats = stats::owner_stats(&jobs);
            DashboardResponse::Owner { user, stats, jobs }
        }
    };

    Ok(Json(response))
}
