//! Handlers for a ticket's conversation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use helpdesk_core::types::DbId;
use helpdesk_db::models::message::SendMessage;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/tickets/{id}/messages
///
/// Oldest first.
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let messages = state.messages().list(&auth.identity, ticket_id).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/tickets/{id}/messages
///
/// Responds 201 with the stored message, or 204 when nothing was posted
/// (blank text, or the ticket no longer exists).
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ticket_id): Path<DbId>,
    Json(input): Json<SendMessage>,
) -> AppResult<Response> {
    let service = state.messages();
    let sent = if input.is_system_message {
        service
            .send_system_message(&auth.identity, ticket_id, &input.message)
            .await?
    } else {
        service.send(&auth.identity, ticket_id, &input.message).await?
    };

    Ok(match sent {
        Some(message) => (StatusCode::CREATED, Json(DataResponse { data: message })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
