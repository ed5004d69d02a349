use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "owner", alias = "carOwner")]
    Owner,
    #[serde(rename = "washer")]
    Washer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Washer => "washer",
        }
    }

    /// Accepts the legacy `carOwner` spelling alongside `owner`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" | "carOwner" => Some(Role::Owner),
            "washer" => Some(Role::Washer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasherProfile {
    pub verified: bool,
    pub verified_at: Option<NaiveDateTime>,
    pub rating: f64,
    pub completed_jobs: i64,
    pub equipment: Vec<String>,
    pub id_doc_url: Option<String>,
    pub selfie_url: Option<String>,
}

impl Default for WasherProfile {
    fn default() -> Self {
        Self {
            verified: false,
            verified_at: None,
            rating: 0.0,
            completed_jobs: 0,
            equipment: Vec::new(),
            id_doc_url: None,
            selfie_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub profile_photo_url: Option<String>,
    pub washer_profile: Option<WasherProfile>,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn new(id: String, name: String, email: String, phone: String, role: Role) -> Self {
        let washer_profile = match role {
            Role::Washer => Some(WasherProfile::default()),
            Role::Owner => None,
        };
        Self {
            id,
            name,
            email,
            phone,
            role,
            profile_photo_url: None,
            washer_profile,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn is_verified_washer(&self) -> bool {
        self.role == Role::Washer
            && self
                .washer_profile
                .as_ref()
                .map(|p| p.verified)
                .unwrap_or(false)
    }
}

/// Admin user-list filter: free-text search plus an optional role.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let matches_role = match self.role.as_deref() {
            None | Some("") | Some("all") => true,
            Some(r) => Role::parse(r) == Some(user.role),
        };

        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term_lower = term.to_lowercase();
                user.name.to_lowercase().contains(&term_lower)
                    || user.email.to_lowercase().contains(&term_lower)
                    || user.phone.contains(term)
            }
        };

        matches_role && matches_search
    }
}
