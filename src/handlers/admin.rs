use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::jobs::{parse_status, StatusUpdateRequest};
use crate::handlers::session::require_admin;
use crate::models::{Job, User, UserFilter};
use crate::services::lifecycle::{self, Actor};
use crate::services::stats::{self, AdminStats};
use crate::services::verification;
use crate::state::AppState;

// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AdminStats>, AppError> {
    require_admin(&state, &headers).await?;

    let db = state.conn()?;
    Ok(Json(stats::admin_stats(&db)?))
}

// GET /api/admin/users
pub async fn get_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>, AppError> {
    require_admin(&state, &headers).await?;

    let users = {
        let db = state.conn()?;
        queries::list_users(&db)?
    };

    Ok(Json(users.into_iter().filter(|u| filter.matches(u)).collect()))
}

// GET /api/admin/jobs
#[derive(Deserialize)]
pub struct JobsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_jobs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    require_admin(&state, &headers).await?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let db = state.conn()?;
    Ok(Json(queries::list_all_jobs(&db, status, limit)?))
}

// POST /api/admin/washers/:id/verify
pub async fn verify_washer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let admin = require_admin(&state, &headers).await?;

    let db = state.conn()?;
    let user = verification::verify_washer(&db, &id, &Utc::now().naive_utc())?;
    tracing::info!(admin = %admin.email, washer_id = %id, "verify washer");
    Ok(Json(user))
}

// POST /api/admin/washers/:id/revoke
pub async fn revoke_washer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let admin = require_admin(&state, &headers).await?;

    let db = state.conn()?;
    let user = verification::revoke_washer(&db, &id)?;
    tracing::info!(admin = %admin.email, washer_id = %id, "revoke washer");
    Ok(Json(user))
}

// POST /api/admin/jobs/:id/status
pub async fn update_job_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Job>, AppError> {
    require_admin(&state, &headers).await?;
    let next = parse_status(&body.status)?;

    let db = state.conn()?;
    let job = lifecycle::transition_job(&db, &id, Actor::Admin, next)?;
    Ok(Json(job))
}
