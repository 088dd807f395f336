//! Statistics endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, services::stats::Stats, AppState};

use super::AuthenticatedAccount;

/// Dashboard counters for the account
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account statistics", body = Stats),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<Stats>> {
    let stats = state.services.stats.get_stats(claims.account_id).await?;
    Ok(Json(stats))
}
