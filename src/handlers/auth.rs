use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::session::{authenticate, current_user, identity_failure, is_admin};
use crate::models::{Role, User};
use crate::services::identity::AuthFlow;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Serialize)]
pub struct SessionResponse {
    token: String,
    user: Option<User>,
    is_admin: bool,
}

fn parse_role(role: Option<&str>) -> Result<Role, AppError> {
    match role.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(Role::Owner),
        Some(r) => Role::parse(r).ok_or_else(|| AppError::Validation(format!("unknown role: {r}"))),
    }
}

// POST /api/auth/signup
#[derive(Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let name = body.name.trim();
    let email = body.email.trim();
    let phone = body.phone.trim();

    if name.is_empty() || email.is_empty() || phone.is_empty() || body.password.is_empty() {
        return Err(AppError::Validation(
            "Please fill in all required fields (name, email, phone, and password)".to_string(),
        ));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    let role = parse_role(body.role.as_deref())?;

    let session = state
        .identity
        .sign_up(email, &body.password)
        .await
        .map_err(|e| identity_failure(e, AuthFlow::SignUp))?;

    let user = User::new(
        session.uid.clone(),
        name.to_string(),
        email.to_string(),
        phone.to_string(),
        role,
    );
    {
        let db = state.conn()?;
        // The identity account already exists upstream at this point.
        queries::insert_user(&db, &user).map_err(|e| {
            tracing::error!(uid = %user.id, email = %user.email, error = %e, "identity account created but profile insert failed");
            e
        })?;
    }

    tracing::info!(uid = %user.id, role = user.role.as_str(), "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token: session.id_token,
            is_admin: state.config.is_admin_email(&user.email),
            user: Some(user),
        }),
    ))
}

// POST /api/auth/signin
#[derive(Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::Validation(
            "Please enter both email and password".to_string(),
        ));
    }

    let session = state
        .identity
        .sign_in(email, &body.password)
        .await
        .map_err(|e| identity_failure(e, AuthFlow::SignIn))?;

    let user = {
        let db = state.conn()?;
        queries::get_user(&db, &session.uid)?
    };

    Ok(Json(SessionResponse {
        is_admin: state.config.is_admin_email(&session.email),
        token: session.id_token,
        user,
    }))
}

// POST /api/auth/google
#[derive(Deserialize)]
pub struct GoogleSignInRequest {
    pub id_token: String,
    pub role: Option<String>,
}

/// Federated sign-in. First-time users get a profile with the requested role;
/// returning users keep the role they already have.
pub async fn google_sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GoogleSignInRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let role = parse_role(body.role.as_deref())?;

    let session = state
        .identity
        .sign_in_with_google(&body.id_token)
        .await
        .map_err(|e| identity_failure(e, AuthFlow::Google))?;

    let user = {
        let db = state.conn()?;
        match queries::get_user(&db, &session.uid)? {
            Some(existing) => existing,
            None => {
                let mut user = User::new(
                    session.uid.clone(),
                    session.display_name.clone().unwrap_or_default(),
                    session.email.clone(),
                    session.phone.clone().unwrap_or_default(),
                    role,
                );
                user.profile_photo_url = session.photo_url.clone();
                queries::insert_user(&db, &user)?;
                tracing::info!(uid = %user.id, role = user.role.as_str(), "user created from google sign-in");
                user
            }
        }
    };

    Ok(Json(SessionResponse {
        is_admin: state.config.is_admin_email(&session.email),
        token: session.id_token,
        user: Some(user),
    }))
}

// GET /api/me
#[derive(Serialize)]
pub struct MeResponse {
    user: User,
    is_admin: bool,
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let identity = authenticate(&state, &headers).await?;

    let db = state.conn()?;
    let user = queries::get_user(&db, &identity.uid)?
        .ok_or_else(|| AppError::NotFound("user profile".to_string()))?;
    Ok(Json(MeResponse {
        is_admin: is_admin(&state, &identity),
        user,
    }))
}

// PATCH /api/me
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &headers).await?;

    let name = body.name.as_deref().map(str::trim);
    let phone = body.phone.as_deref().map(str::trim);
    if name == Some("") || phone == Some("") {
        return Err(AppError::Validation("name and phone cannot be empty".to_string()));
    }

    let db = state.conn()?;
    queries::update_user_contact(&db, &user.id, name, phone)?;
    let updated = queries::get_user(&db, &user.id)?
        .ok_or_else(|| AppError::NotFound("user profile".to_string()))?;
    Ok(Json(updated))
}

// PUT /api/me/washer-profile
#[derive(Deserialize)]
pub struct WasherDocumentsRequest {
    pub equipment: Option<Vec<String>>,
    pub id_doc_url: Option<String>,
    pub selfie_url: Option<String>,
}

/// Washers fill in equipment and verification documents. Verification
/// status, rating and job counts are not writable here.
pub async fn update_washer_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<WasherDocumentsRequest>,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &headers).await?;
    if user.role != Role::Washer {
        return Err(AppError::Forbidden("only washers have a washer profile".to_string()));
    }

    let equipment: Option<Vec<String>> = body.equipment.map(|items| {
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    });

    let db = state.conn()?;
    queries::update_washer_documents(
        &db,
        &user.id,
        equipment.as_deref(),
        body.id_doc_url.as_deref(),
        body.selfie_url.as_deref(),
    )?;
    let updated = queries::get_user(&db, &user.id)?
        .ok_or_else(|| AppError::NotFound("user profile".to_string()))?;
    Ok(Json(updated))
}
