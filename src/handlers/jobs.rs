use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::session::{authenticate, current_user, is_admin};
use crate::models::{Job, JobStatus};
use crate::services::booking::{self, BookingRequest};
use crate::services::lifecycle::{self, Actor};
use crate::state::AppState;

// GET /api/washers
#[derive(Serialize)]
pub struct WasherSummary {
    id: String,
    name: String,
    rating: f64,
    completed_jobs: i64,
}

pub async fn list_washers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<WasherSummary>>, AppError> {
    current_user(&state, &headers).await?;

    let washers = {
        let db = state.conn()?;
        queries::list_verified_washers(&db)?
    };

    let response = washers
        .into_iter()
        .map(|w| {
            let (rating, completed_jobs) = w
                .washer_profile
                .as_ref()
                .map(|p| (p.rating, p.completed_jobs))
                .unwrap_or((0.0, 0));
            WasherSummary {
                id: w.id,
                name: w.name,
                rating,
                completed_jobs,
            }
        })
        .collect();

    Ok(Json(response))
}

// POST /api/jobs
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let owner = current_user(&state, &headers).await?;

    let job = {
        let db = state.conn()?;
        booking::create_job(&db, &owner, &body, Utc::now().date_naive())?
    };

    Ok((StatusCode::CREATED, Json(job)))
}

// GET /api/jobs/open
pub async fn list_open_jobs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Job>>, AppError> {
    let user = current_user(&state, &headers).await?;
    if !user.is_verified_washer() {
        return Err(AppError::Forbidden(
            "only verified washers can browse open jobs".to_string(),
        ));
    }

    let db = state.conn()?;
    Ok(Json(queries::list_open_jobs(&db)?))
}

// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let identity = authenticate(&state, &headers).await?;

    let db = state.conn()?;
    let job = queries::get_job(&db, &id)?;

    // Admins need no profile row. Everyone else only sees jobs they are part of,
    // and other jobs are reported as missing.
    let job = if is_admin(&state, &identity) {
        job
    } else {
        let user = queries::get_user(&db, &identity.uid)?
            .ok_or_else(|| AppError::NotFound("user profile".to_string()))?;
        job.filter(|j| j.owner_id == user.id || j.washer_id.as_deref() == Some(user.id.as_str()))
    };

    Ok(Json(job.ok_or_else(|| AppError::NotFound("job".to_string()))?))
}

// POST /api/jobs/:id/accept
pub async fn accept_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let washer = current_user(&state, &headers).await?;

    let db = state.conn()?;
    let job = lifecycle::accept_job(&db, &id, &washer)?;
    Ok(Json(job))
}

// POST /api/jobs/:id/status
#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

pub fn parse_status(raw: &str) -> Result<JobStatus, AppError> {
    JobStatus::parse(raw.trim())
        .ok_or_else(|| AppError::Validation(format!("unknown job status: {raw}")))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Job>, AppError> {
    let user = current_user(&state, &headers).await?;
    let next = parse_status(&body.status)?;

    let db = state.conn()?;
    let job = lifecycle::transition_job(&db, &id, Actor::Member(&user), next)?;
    Ok(Json(job))
}
