use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::models::{GeoPoint, Job, JobStatus, Role, ServiceType, User, VehicleType};

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    #[serde(default = "default_service")]
    pub service_type: ServiceType,
    #[serde(default = "default_vehicle")]
    pub vehicle_type: VehicleType,
    pub pickup_location: Option<GeoPoint>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    /// Empty or absent means "any available washer".
    pub washer_id: Option<String>,
}

fn default_service() -> ServiceType {
    ServiceType::Exterior
}

fn default_vehicle() -> VehicleType {
    VehicleType::SmallCar
}

#[derive(Debug)]
pub enum BookingError {
    NotAnOwner,
    MissingLocation,
    InvalidLocation,
    MissingSchedule,
    InvalidSchedule(String),
    ScheduledInPast,
    WasherUnavailable,
    Storage(anyhow::Error),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::NotAnOwner => write!(f, "Only car owners can request a wash"),
            BookingError::MissingLocation => write!(f, "Please pick a location on the map"),
            BookingError::InvalidLocation => write!(f, "Pickup location is out of range"),
            BookingError::MissingSchedule => {
                write!(f, "Please select a date and time for your wash")
            }
            BookingError::InvalidSchedule(detail) => write!(f, "Invalid date or time: {detail}"),
            BookingError::ScheduledInPast => write!(f, "Please pick a date from today onwards"),
            BookingError::WasherUnavailable => {
                write!(f, "The selected washer is not available. Please pick another washer.")
            }
            BookingError::Storage(e) => write!(f, "failed to save job: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_schedule(date: &str, time: &str) -> Result<NaiveDateTime, BookingError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidSchedule(format!("expected YYYY-MM-DD, got {date}")))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| BookingError::InvalidSchedule(format!("expected HH:MM, got {time}")))?;
    Ok(date.and_time(time))
}

/// Validates a booking and stores the job. Nothing is written unless every
/// check passes. `today` bounds the earliest allowed date.
pub fn create_job(
    conn: &Connection,
    owner: &User,
    req: &BookingRequest,
    today: NaiveDate,
) -> Result<Job, BookingError> {
    if owner.role != Role::Owner {
        return Err(BookingError::NotAnOwner);
    }

    let location = req.pickup_location.ok_or(BookingError::MissingLocation)?;
    if !location.is_valid() {
        return Err(BookingError::InvalidLocation);
    }

    let (date, time) = match (
        non_empty(req.scheduled_date.as_deref()),
        non_empty(req.scheduled_time.as_deref()),
    ) {
        (Some(d), Some(t)) => (d, t),
        _ => return Err(BookingError::MissingSchedule),
    };
    let scheduled_at = parse_schedule(date, time)?;
    if scheduled_at.date() < today {
        return Err(BookingError::ScheduledInPast);
    }

    let washer_id = match non_empty(req.washer_id.as_deref()) {
        Some(id) => {
            let washer = queries::get_user(conn, id).map_err(BookingError::Storage)?;
            match washer {
                Some(w) if w.is_verified_washer() => Some(w.id),
                _ => return Err(BookingError::WasherUnavailable),
            }
        }
        None => None,
    };

    let now = Utc::now().naive_utc();
    let job = Job {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner.id.clone(),
        status: if washer_id.is_some() {
            JobStatus::Assigned
        } else {
            JobStatus::Requested
        },
        washer_id,
        service_type: req.service_type,
        vehicle_type: req.vehicle_type,
        pickup_location: location,
        price: req.service_type.price(),
        scheduled_at,
        created_at: now,
        updated_at: now,
    };

    queries::insert_job(conn, &job).map_err(BookingError::Storage)?;

    tracing::info!(
        job_id = %job.id,
        owner_id = %job.owner_id,
        status = %job.status,
        price = job.price,
        "job created"
    );

    Ok(job)
}
