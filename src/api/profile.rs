//! Own-profile endpoints

use axum::{extract::State, Json};
use axum_extra::extract::{Multipart, WithRejection};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::account::{Account, UpdateProfile},
    AppState,
};

use super::{AuthenticatedAccount, MessageResponse};

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub message: String,
    #[serde(rename = "utilisateur")]
    pub account: Account,
}

#[derive(Serialize, ToSchema)]
pub struct PhotoResponse {
    pub message: String,
    /// Stored file name, served under /uploads/profiles/
    pub photo_profil: String,
}

/// Get own profile
#[utoipa::path(
    get,
    path = "/profile",
    tag = "profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own profile", body = Account),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<Account>> {
    let account = state.services.profile.get_profile(claims.account_id).await?;
    Ok(Json(account))
}

/// Update own profile (name, email, password)
#[utoipa::path(
    put,
    path = "/profile",
    tag = "profile",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Email already used or wrong current password", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    WithRejection(Json(update), _): WithRejection<Json<UpdateProfile>, AppError>,
) -> AppResult<Json<ProfileResponse>> {
    let account = state
        .services
        .profile
        .update_profile(claims.account_id, update)
        .await?;

    Ok(Json(ProfileResponse {
        message: "Profil mis à jour avec succès".to_string(),
        account,
    }))
}

/// Delete own account with its catalog, members, loans and fines
#[utoipa::path(
    delete,
    path = "/profile",
    tag = "profile",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<MessageResponse>> {
    state.services.profile.delete_account(claims.account_id).await?;
    state.services.auth.logout(&claims).await?;
    Ok(Json(MessageResponse::new("Compte supprimé")))
}

/// Upload a profile photo (multipart field `photo`)
#[utoipa::path(
    post,
    path = "/profile/photo",
    tag = "profile",
    security(("bearer_auth" = [])),
    request_body(content = String, content_type = "multipart/form-data", description = "Field `photo`: png, jpg, jpeg or gif"),
    responses(
        (status = 200, description = "Photo stored", body = PhotoResponse),
        (status = 400, description = "Missing photo or unsupported format", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    mut multipart: Multipart,
) -> AppResult<Json<PhotoResponse>> {
    let invalid_form = |e: axum_extra::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("Formulaire invalide: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        if field.name() != Some("photo") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(invalid_form)?;

        let stored = state
            .services
            .profile
            .update_photo(claims.account_id, &file_name, &data)
            .await?;

        return Ok(Json(PhotoResponse {
            message: "Photo de profil mise à jour".to_string(),
            photo_profil: stored,
        }));
    }

    Err(AppError::BadRequest("Aucune photo fournie".to_string()))
}
