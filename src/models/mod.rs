pub mod job;
pub mod location;
pub mod user;

pub use job::{Job, JobStatus, ServiceType, VehicleType};
pub use location::GeoPoint;
pub use user::{Role, User, UserFilter, WasherProfile};
