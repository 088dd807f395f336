//! Fine endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::fine::FineDetails, AppState};

use super::AuthenticatedAccount;

/// List own fines
#[utoipa::path(
    get,
    path = "/amendes",
    tag = "fines",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Fines of the account", body = Vec<FineDetails>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_fines(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<Vec<FineDetails>>> {
    let fines = state.services.loans.list_fines(claims.account_id).await?;
    Ok(Json(fines))
}

/// Mark a fine paid
#[utoipa::path(
    post,
    path = "/amendes/{id}/payer",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Fine ID")
    ),
    responses(
        (status = 200, description = "Fine paid", body = FineDetails),
        (status = 404, description = "Fine not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    Path(id): Path<i64>,
) -> AppResult<Json<FineDetails>> {
    let fine = state.services.loans.pay_fine(claims.account_id, id).await?;
    Ok(Json(fine))
}
