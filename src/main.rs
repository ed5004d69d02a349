use std::sync::{Arc, Mutex};

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use gentlewash::config::AppConfig;
use gentlewash::db;
use gentlewash::handlers;
use gentlewash::services::identity::firebase::FirebaseIdentity;
use gentlewash::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.identity_api_key.is_empty() {
        tracing::warn!("IDENTITY_API_KEY is not set, sign-in will fail");
    }
    if config.admin_email.is_empty() {
        tracing::warn!("ADMIN_EMAIL is not set, admin endpoints are disabled");
    }
    tracing::info!("using identity service at {}", config.identity_base_url);

    let identity = FirebaseIdentity::new(
        config.identity_api_key.clone(),
        config.identity_base_url.clone(),
        config.identity_request_uri.clone(),
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        identity: Box::new(identity),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/catalog", get(handlers::catalog::get_catalog))
        .route(
            "/api/location/default",
            get(handlers::catalog::default_location),
        )
        .route("/api/auth/signup", post(handlers::auth::sign_up))
        .route("/api/auth/signin", post(handlers::auth::sign_in))
        .route("/api/auth/google", post(handlers::auth::google_sign_in))
        .route(
            "/api/me",
            get(handlers::auth::me).patch(handlers::auth::update_me),
        )
        .route(
            "/api/me/washer-profile",
            put(handlers::auth::update_washer_profile),
        )
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/api/washers", get(handlers::jobs::list_washers))
        .route("/api/jobs", post(handlers::jobs::create_job))
        .route("/api/jobs/open", get(handlers::jobs::list_open_jobs))
        .route("/api/jobs/:id", get(handlers::jobs::get_job))
        .route("/api/jobs/:id/accept", post(handlers::jobs::accept_job))
        .route("/api/jobs/:id/status", post(handlers::jobs::update_status))
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route("/api/admin/users", get(handlers::admin::get_users))
        .route("/api/admin/jobs", get(handlers::admin::get_jobs))
        .route(
            "/api/admin/washers/:id/verify",
            post(handlers::admin::verify_washer),
        )
        .route(
            "/api/admin/washers/:id/revoke",
            post(handlers::admin::revoke_washer),
        )
        .route(
            "/api/admin/jobs/:id/status",
            post(handlers::admin::update_job_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
