//! Handlers for the `/tickets` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_core::ticket::{TicketCategory, TicketPriority, TicketStatus};
use helpdesk_core::types::DbId;
use helpdesk_db::models::ticket::{CreateTicket, TicketChanges, TicketScope};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireManager, RequireStaff};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /tickets`.
#[derive(Debug, Default, Deserialize)]
pub struct TicketListParams {
    /// Staff only: restrict to one assignee.
    pub assigned_to: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct PriorityRequest {
    pub priority: TicketPriority,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: TicketCategory,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub name: String,
}

/// GET /api/v1/tickets
///
/// Staff see every ticket (or one assignee's); customers only their own.
/// Most recently updated first.
pub async fn list_tickets(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TicketListParams>,
) -> AppResult<impl IntoResponse> {
    let scope = params
        .assigned_to
        .map_or(TicketScope::All, TicketScope::AssignedTo);
    let tickets = state.tickets().list(&auth.identity, scope).await?;
    Ok(Json(DataResponse { data: tickets }))
}

/// GET /api/v1/tickets/unassigned
///
/// Manager queue, oldest first.
pub async fn unassigned_queue(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tickets = state
        .tickets()
        .list(&auth.identity, TicketScope::Unassigned)
        .await?;
    Ok(Json(DataResponse { data: tickets }))
}

/// POST /api/v1/tickets
pub async fn create_ticket(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTicket>,
) -> AppResult<impl IntoResponse> {
    let ticket = state.tickets().create(&auth.identity, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: ticket })))
}

/// GET /api/v1/tickets/{id}
pub async fn get_ticket(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let ticket = state.tickets().get(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// PATCH /api/v1/tickets/{id}
///
/// Manager "save changes": writes only what differs, reassigns through the
/// atomic assignment unit and touches the ticket once.
pub async fn save_changes(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(changes): Json<TicketChanges>,
) -> AppResult<impl IntoResponse> {
    let ticket = state
        .assignment()
        .save_changes(&auth.identity, id, &changes)
        .await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// PUT /api/v1/tickets/{id}/status
pub async fn update_status(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<StatusRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = state
        .tickets()
        .update_status(&auth.identity, id, input.status)
        .await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// PUT /api/v1/tickets/{id}/priority
pub async fn update_priority(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PriorityRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = state
        .tickets()
        .update_priority(&auth.identity, id, input.priority)
        .await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// PUT /api/v1/tickets/{id}/category
pub async fn update_category(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CategoryRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = state
        .tickets()
        .update_category(&auth.identity, id, input.category)
        .await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// PUT /api/v1/tickets/{id}/title
pub async fn update_title(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<TitleRequest>,
) -> AppResult<impl IntoResponse> {
    let ticket = state
        .tickets()
        .update_title(&auth.identity, id, &input.name)
        .await?;
    Ok(Json(DataResponse { data: ticket }))
}

/// DELETE /api/v1/tickets/{id}
///
/// Removes the conversation first; the ticket survives if that fails.
pub async fn delete_ticket(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.tickets().delete(&auth.identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
