use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Exterior,
    Interior,
    Both,
    Detailing,
}

impl ServiceType {
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Exterior,
        ServiceType::Interior,
        ServiceType::Both,
        ServiceType::Detailing,
    ];

    /// Flat price in Rand.
    pub fn price(&self) -> i64 {
        match self {
            ServiceType::Exterior => 250,
            ServiceType::Interior => 300,
            ServiceType::Both => 500,
            ServiceType::Detailing => 1200,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceType::Exterior => "Exterior Only",
            ServiceType::Interior => "Interior Only",
            ServiceType::Both => "Full Service (Both)",
            ServiceType::Detailing => "Full House Car Detailing",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Exterior => "exterior",
            ServiceType::Interior => "interior",
            ServiceType::Both => "both",
            ServiceType::Detailing => "detailing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleType {
    SmallCar,
    Suv,
    Minibus,
    Sedan,
    Pickup,
    Sports,
    Commercial,
}

impl VehicleType {
    pub const ALL: [VehicleType; 7] = [
        VehicleType::SmallCar,
        VehicleType::Suv,
        VehicleType::Minibus,
        VehicleType::Sedan,
        VehicleType::Pickup,
        VehicleType::Sports,
        VehicleType::Commercial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::SmallCar => "small-car",
            VehicleType::Suv => "suv",
            VehicleType::Minibus => "minibus",
            VehicleType::Sedan => "sedan",
            VehicleType::Pickup => "pickup",
            VehicleType::Sports => "sports",
            VehicleType::Commercial => "commercial",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VehicleType::SmallCar => "Small Car",
            VehicleType::Suv => "SUV / 4x4",
            VehicleType::Minibus => "Minibus",
            VehicleType::Sedan => "Sedan",
            VehicleType::Pickup => "Pickup",
            VehicleType::Sports => "Luxury",
            VehicleType::Commercial => "Commercial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Requested,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Requested => "REQUESTED",
            JobStatus::Assigned => "ASSIGNED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    /// Case-insensitive; `pending` is the old name for an unassigned request.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "REQUESTED" | "PENDING" => Some(JobStatus::Requested),
            "ASSIGNED" => Some(JobStatus::Assigned),
            "IN_PROGRESS" => Some(JobStatus::InProgress),
            "COMPLETED" => Some(JobStatus::Completed),
            "CANCELLED" | "CANCELED" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    pub fn allowed_next(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Requested => &[JobStatus::Assigned, JobStatus::Cancelled],
            JobStatus::Assigned => &[
                JobStatus::InProgress,
                JobStatus::Requested,
                JobStatus::Completed,
                JobStatus::Cancelled,
            ],
            JobStatus::InProgress => &[JobStatus::Completed],
            JobStatus::Completed | JobStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub owner_id: String,
    pub washer_id: Option<String>,
    pub service_type: ServiceType,
    pub vehicle_type: VehicleType,
    pub pickup_location: GeoPoint,
    pub price: i64,
    pub status: JobStatus,
    pub scheduled_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
