//! Member registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::member::{CreateMember, Member, UpdateMember},
    AppState,
};

use super::{AuthenticatedAccount, MessageResponse};

/// List own members
#[utoipa::path(
    get,
    path = "/membres",
    tag = "members",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Members of the account", body = Vec<Member>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
) -> AppResult<Json<Vec<Member>>> {
    let members = state.services.catalog.list_members(claims.account_id).await?;
    Ok(Json(members))
}

/// Register a member
#[utoipa::path(
    post,
    path = "/membres",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    WithRejection(Json(member), _): WithRejection<Json<CreateMember>, AppError>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let created = state
        .services
        .catalog
        .create_member(claims.account_id, member)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a member, including their status
#[utoipa::path(
    put,
    path = "/membres/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Member ID")
    ),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    Path(id): Path<i64>,
    WithRejection(Json(update), _): WithRejection<Json<UpdateMember>, AppError>,
) -> AppResult<Json<Member>> {
    let updated = state
        .services
        .catalog
        .update_member(claims.account_id, id, update)
        .await?;
    Ok(Json(updated))
}

/// Delete a member with their loans and fines
#[utoipa::path(
    delete,
    path = "/membres/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member deleted", body = MessageResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AuthenticatedAccount(claims): AuthenticatedAccount,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state.services.catalog.delete_member(claims.account_id, id).await?;
    Ok(Json(MessageResponse::new("Membre supprimé")))
}
