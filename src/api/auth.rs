//! Authentication endpoints: registration, login, email verification and password reset

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::account::{
        Account, EmailRequest, LoginRequest, RegisterRequest, ResetCodeRequest,
        ResetPasswordRequest, VerifyEmailRequest,
    },
    services::auth::EmailVerification,
    AppState,
};

use super::{AuthenticatedAccount, MessageResponse};

const EMAIL_NOT_SENT: &str =
    "L'email n'a pas pu être envoyé. Utilisez « renvoyer le lien » pour réessayer.";

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(rename = "utilisateur")]
    pub account: Account,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    /// Bearer token for the Authorization header
    pub token: String,
    #[serde(rename = "utilisateur")]
    pub account: Account,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub success: bool,
    pub already_verified: bool,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct CodeCheckResponse {
    pub message: String,
    pub valid: bool,
}

/// Create an account and send its verification link
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification pending", body = RegisterResponse),
        (status = 400, description = "Invalid input or email already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let registration = state.services.auth.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Inscription réussie ! Vérifiez votre email pour activer votre compte."
                .to_string(),
            account: registration.account,
            warning: (!registration.email_sent).then(|| EMAIL_NOT_SENT.to_string()),
        }),
    ))
}

/// Verify an email address with the token from the link
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 400, description = "Missing or expired token", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown token", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<VerifyEmailRequest>, AppError>,
) -> AppResult<Json<VerifyEmailResponse>> {
    let response = match state.services.auth.verify_email(request).await? {
        EmailVerification::Verified { email } => VerifyEmailResponse {
            message: "Email vérifié avec succès ! Vous pouvez maintenant vous connecter."
                .to_string(),
            success: true,
            already_verified: false,
            email,
        },
        EmailVerification::AlreadyVerified { email } => VerifyEmailResponse {
            message: "Email déjà vérifié".to_string(),
            success: true,
            already_verified: true,
            email,
        },
    };

    Ok(Json(response))
}

/// Send a new verification link
#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Link sent if the account exists", body = MessageResponse),
        (status = 400, description = "Missing email or already verified", body = crate::error::ErrorResponse)
    )
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<EmailRequest>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.resend_verification(request).await?;
    Ok(Json(MessageResponse::new(
        "Si cet email existe, un nouveau lien a été envoyé",
    )))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 403, description = "Email not verified", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<LoginResponse>> {
    let session = state.services.auth.login(request).await?;

    Ok(Json(LoginResponse {
        message: "Connexion réussie".to_string(),
        token: session.token,
        account: session.account,
    }))
}

/// Log out, revoking the presented token
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.logout(&claims).await?;
    Ok(Json(MessageResponse::new("Déconnexion réussie")))
}

/// Get current account
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current account", body = Account),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<Account>> {
    let account = state.services.auth.me(claims.account_id).await?;
    Ok(Json(account))
}

/// Request a password reset code by email
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent if the account exists", body = MessageResponse),
        (status = 400, description = "Missing email", body = crate::error::ErrorResponse)
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<EmailRequest>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.forgot_password(request).await?;
    Ok(Json(MessageResponse::new(
        "Si cet email existe, un code de réinitialisation a été envoyé",
    )))
}

/// Check a reset code without using it
#[utoipa::path(
    post,
    path = "/auth/verify-reset-code",
    tag = "auth",
    request_body = ResetCodeRequest,
    responses(
        (status = 200, description = "Code is valid", body = CodeCheckResponse),
        (status = 400, description = "Missing, expired or wrong code", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown email", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_reset_code(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ResetCodeRequest>, AppError>,
) -> AppResult<Json<CodeCheckResponse>> {
    state.services.auth.verify_reset_code(request).await?;
    Ok(Json(CodeCheckResponse {
        message: "Code valide".to_string(),
        valid: true,
    }))
}

/// Set a new password with a reset code
#[utoipa::path(
    post,
    path = "/auth/reset-password-with-code",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing fields, weak password, expired or wrong code", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown email", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset_password_with_code(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ResetPasswordRequest>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.reset_password_with_code(request).await?;
    Ok(Json(MessageResponse::new(
        "Mot de passe réinitialisé avec succès",
    )))
}
