//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, backups, books, fines, health, loans, members, profile, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BiblioTech API",
        version = "2.0.0",
        description = "Library management REST API: catalog, members, loans and fines per account"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::verify_email,
        auth::resend_verification,
        auth::login,
        auth::logout,
        auth::me,
        auth::forgot_password,
        auth::verify_reset_code,
        auth::reset_password_with_code,
        // Profile
        profile::get_profile,
        profile::update_profile,
        profile::delete_profile,
        profile::upload_photo,
        // Books
        books::list_books,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Members
        members::list_members,
        members::create_member,
        members::update_member,
        members::delete_member,
        // Loans
        loans::list_loans,
        loans::create_loan,
        loans::return_loan,
        // Fines
        fines::list_fines,
        fines::pay_fine,
        // Stats
        stats::get_stats,
        // Backups
        backups::list_backups,
        backups::create_backup,
    ),
    components(
        schemas(
            // Auth
            crate::models::account::Account,
            crate::models::account::Role,
            crate::models::account::RegisterRequest,
            crate::models::account::LoginRequest,
            crate::models::account::VerifyEmailRequest,
            crate::models::account::EmailRequest,
            crate::models::account::ResetCodeRequest,
            crate::models::account::ResetPasswordRequest,
            crate::models::account::UpdateProfile,
            auth::RegisterResponse,
            auth::LoginResponse,
            auth::VerifyEmailResponse,
            auth::CodeCheckResponse,
            // Profile
            profile::ProfileResponse,
            profile::PhotoResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Members
            crate::models::member::Member,
            crate::models::member::MemberStatus,
            crate::models::member::CreateMember,
            crate::models::member::UpdateMember,
            // Loans
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanStatus,
            crate::models::loan::CreateLoan,
            loans::ReturnResponse,
            // Fines
            crate::models::fine::FineDetails,
            crate::models::fine::FineStatus,
            // Stats
            crate::services::stats::Stats,
            // Backups
            crate::services::backup::BackupEntry,
            crate::services::backup::BackupInfo,
            backups::BackupListResponse,
            backups::BackupCreatedResponse,
            // Health
            health::HealthResponse,
            // Common
            crate::api::MessageResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login, email verification and password reset"),
        (name = "profile", description = "Own profile"),
        (name = "books", description = "Book catalog"),
        (name = "members", description = "Library members"),
        (name = "loans", description = "Loans and returns"),
        (name = "fines", description = "Late-return fines"),
        (name = "stats", description = "Statistics"),
        (name = "backups", description = "Database snapshots (administrators)")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
