use std::env;

use crate::models::GeoPoint;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_email: String,
    pub identity_api_key: String,
    pub identity_base_url: String,
    pub identity_request_uri: String,
    pub default_location: GeoPoint,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let default_location = GeoPoint {
            lat: env::var("DEFAULT_LAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(GeoPoint::FALLBACK.lat),
            lng: env::var("DEFAULT_LNG")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(GeoPoint::FALLBACK.lng),
        };

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "gentlewash.db".to_string()),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            identity_api_key: env::var("IDENTITY_API_KEY").unwrap_or_default(),
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .unwrap_or_else(|_| "https://identitytoolkit.googleapis.com/v1".to_string()),
            identity_request_uri: env::var("IDENTITY_REQUEST_URI")
                .unwrap_or_else(|_| "http://localhost".to_string()),
            default_location,
        }
    }

    /// Admin is whoever signs in with the configured email. An empty setting
    /// disables the admin surface entirely.
    pub fn is_admin_email(&self, email: &str) -> bool {
        !self.admin_email.is_empty() && self.admin_email.eq_ignore_ascii_case(email)
    }
}
