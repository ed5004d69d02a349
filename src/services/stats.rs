use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::models::{Job, JobStatus, WasherProfile};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdminStats {
    pub total_users: i64,
    pub car_owners: i64,
    pub washers: i64,
    pub verified_washers: i64,
    pub total_jobs: i64,
    pub pending_jobs: i64,
    pub completed_jobs: i64,
    pub total_revenue: i64,
}

pub fn admin_stats(conn: &Connection) -> anyhow::Result<AdminStats> {
    let users = queries::get_user_counts(conn)?;
    let jobs = queries::get_job_counts(conn)?;

    Ok(AdminStats {
        total_users: users.total,
        car_owners: users.owners,
        washers: users.washers,
        verified_washers: users.verified_washers,
        total_jobs: jobs.total,
        pending_jobs: jobs.requested,
        completed_jobs: jobs.completed,
        total_revenue: jobs.completed_revenue,
    })
}

/// Sum of `price` over completed jobs.
pub fn completed_revenue(jobs: &[Job]) -> i64 {
    jobs.iter()
        .filter(|j| j.status == JobStatus::Completed)
        .map(|j| j.price)
        .sum()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WasherStats {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub total_earnings: i64,
    pub average_rating: f64,
}

pub fn washer_stats(jobs: &[Job], profile: Option<&WasherProfile>) -> WasherStats {
    WasherStats {
        total_jobs: jobs.len(),
        completed_jobs: jobs.iter().filter(|j| j.status == JobStatus::Completed).count(),
        total_earnings: completed_revenue(jobs),
        average_rating: profile.map(|p| p.rating).unwrap_or(0.0),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OwnerStats {
    pub total_jobs: usize,
    pub completed_jobs: usize,
}

pub fn owner_stats(jobs: &[Job]) -> OwnerStats {
    OwnerStats {
        total_jobs: jobs.len(),
        completed_jobs: jobs.iter().filter(|j| j.status == JobStatus::Completed).count(),
    }
}
