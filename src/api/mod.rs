//! API handlers for BiblioTech REST endpoints

pub mod auth;
pub mod backups;
pub mod books;
pub mod fines;
pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;
pub mod profile;
pub mod stats;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::account::AccountClaims, AppState};

/// Extractor for the authenticated account, from the bearer JWT
pub struct AuthenticatedAccount(pub AccountClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let unauthenticated = || AppError::Authentication("Non authentifié".to_string());

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(unauthenticated)?;

        let claims = AccountClaims::from_token(token, &state.config.auth.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            unauthenticated()
        })?;

        if state.services.auth.is_token_revoked(&claims.jti).await? {
            return Err(unauthenticated());
        }

        Ok(AuthenticatedAccount(claims))
    }
}

/// Plain confirmation message
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    /// Set when a notification email could not be delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warning: None,
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave room for the multipart framing around the photo itself
    let photo_limit = state.config.uploads.max_size_bytes + 64 * 1024;

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/resend-verification", post(auth::resend_verification))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/verify-reset-code", post(auth::verify_reset_code))
        .route("/auth/reset-password-with-code", post(auth::reset_password_with_code))
        // Profile
        .route("/profile", get(profile::get_profile))
        .route("/profile", put(profile::update_profile))
        .route("/profile", delete(profile::delete_profile))
        .route(
            "/profile/photo",
            post(profile::upload_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        // Books
        .route("/livres", get(books::list_books))
        .route("/livres", post(books::create_book))
        .route("/livres/:id", put(books::update_book))
        .route("/livres/:id", delete(books::delete_book))
        // Members
        .route("/membres", get(members::list_members))
        .route("/membres", post(members::create_member))
        .route("/membres/:id", put(members::update_member))
        .route("/membres/:id", delete(members::delete_member))
        // Loans
        .route("/emprunts", get(loans::list_loans))
        .route("/emprunts", post(loans::create_loan))
        .route("/emprunts/:id/retour", post(loans::return_loan))
        // Fines
        .route("/amendes", get(fines::list_fines))
        .route("/amendes/:id/payer", post(fines::pay_fine))
        // Statistics
        .route("/stats", get(stats::get_stats))
        // Backups
        .route("/backups", get(backups::list_backups))
        .route("/backups", post(backups::create_backup))
        .with_state(state.clone());

    // Uploaded profile photos
    let photos = ServeDir::new(state.services.profile.photos_dir());

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .nest_service("/uploads/profiles", photos)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
