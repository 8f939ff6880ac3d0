//! Handlers for assignment and the employee roster.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_core::types::DbId;
use helpdesk_db::models::message::Message;
use helpdesk_db::models::ticket::Ticket;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::rbac::{RequireManager, RequireStaff};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assignee_id: DbId,
}

/// Both rows written by one assignment.
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub ticket: Ticket,
    pub notice: Message,
}

#[derive(Debug, Default, Deserialize)]
pub struct RosterParams {
    pub department: Option<String>,
}

/// POST /api/v1/tickets/{id}/assign
pub async fn assign_ticket(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AssignRequest>,
) -> AppResult<impl IntoResponse> {
    let (ticket, notice) = state
        .assignment()
        .assign(&auth.identity, id, input.assignee_id)
        .await?;
    Ok(Json(DataResponse {
        data: AssignmentResponse { ticket, notice },
    }))
}

/// GET /api/v1/tickets/{id}/recommendation
///
/// Advisory only; `data` is `null` when nobody is on the roster.
pub async fn recommend_assignee(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let choice = state.assignment().recommend(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: choice }))
}

/// GET /api/v1/employees
///
/// Roster with open-ticket load, least loaded first. `?department=` filters
/// case-insensitively.
pub async fn list_employees(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<RosterParams>,
) -> AppResult<impl IntoResponse> {
    let roster = state
        .assignment()
        .roster(&auth.identity, params.department.as_deref())
        .await?;
    Ok(Json(DataResponse { data: roster }))
}

/// GET /api/v1/employees/{id}/metrics
///
/// Ticket, message and article figures for one employee. Managers may view
/// anyone; other staff only themselves.
pub async fn employee_metrics(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let metrics = state.assignment().metrics(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: metrics }))
}
