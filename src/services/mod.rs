pub mod booking;
pub mod identity;
pub mod lifecycle;
pub mod stats;
pub mod verification;
