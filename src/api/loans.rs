//! Loan endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::FineDetails,
        loan::{CreateLoan, LoanDetails},
    },
    AppState,
};

use super::AuthenticatedAccount;

/// The returned loan, plus the fine when it came back late
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    #[serde(flatten)]
    pub loan: LoanDetails,
    #[serde(rename = "amende", skip_serializing_if = "Option::is_none")]
    pub fine: Option<FineDetails>,
}

/// List own loans, most recent first
#[utoipa::path(
    get,
    path = "/emprunts",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Loans of the account", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans(claims.account_id).await?;
    Ok(Json(loans))
}

/// Lend a book to a member
#[utoipa::path(
    post,
    path = "/emprunts",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "Book unavailable or member invalid", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    WithRejection(Json(loan), _): WithRejection<Json<CreateLoan>, AppError>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let created = state.services.loans.create_loan(claims.account_id, loan).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/emprunts/{id}/retour",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 400, description = "Loan already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    Path(id): Path<i64>,
) -> AppResult<Json<ReturnResponse>> {
    let outcome = state.services.loans.return_loan(claims.account_id, id).await?;

    Ok(Json(ReturnResponse {
        loan: outcome.loan,
        fine: outcome.fine,
    }))
}
