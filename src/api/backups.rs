//! Database backup endpoints (administrators only)

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    services::backup::{BackupEntry, BackupInfo},
    AppState,
};

use super::AuthenticatedAccount;

#[derive(Serialize, ToSchema)]
pub struct BackupListResponse {
    pub info: BackupInfo,
    pub backups: Vec<BackupEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct BackupCreatedResponse {
    pub message: String,
    pub file: String,
}

/// List snapshots, newest first
#[utoipa::path(
    get,
    path = "/backups",
    tag = "backups",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Snapshots", body = BackupListResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_backups(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<BackupListResponse>> {
    claims.require_admin()?;

    let backups = state.services.backup.list_backups().await?;
    let info = state.services.backup.backup_info().await?;
    Ok(Json(BackupListResponse { info, backups }))
}

/// Take a snapshot now
#[utoipa::path(
    post,
    path = "/backups",
    tag = "backups",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Snapshot created", body = BackupCreatedResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 500, description = "Snapshot failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_backup(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<(StatusCode, Json<BackupCreatedResponse>)> {
    claims.require_admin()?;

    let path = state.services.backup.create_backup().await?;
    tracing::info!(account_id = claims.account_id, "Manual backup {}", path.display());

    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(BackupCreatedResponse {
            message: "Sauvegarde créée".to_string(),
            file,
        }),
    ))
}
