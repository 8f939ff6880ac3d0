use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use helpdesk_core::error::CoreError;
use helpdesk_core::types::DbId;
use helpdesk_db::StoreError;
use helpdesk_desk::{AccessResolver, Requirement};
use helpdesk_events::{ChangeEvent, RecvError, Subscription, Table, Topic};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::ws::manager::WsSender;
use crate::ws::protocol::{ClientCommand, ServerMessage};

/// Browsers cannot set headers on a WebSocket handshake, so the bearer
/// token travels in the query string.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// HTTP handler that authenticates the caller and upgrades the connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> AppResult<impl IntoResponse> {
    let auth = AuthUser::from_token(&state, &params.token).await?;
    AccessResolver::check(&auth.identity, Requirement::Authenticated)?;
    let user_id = auth.user_id;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// A sender task drains the manager channel into the sink while this task
/// processes commands. On disconnect the connection and its watch are
/// removed.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    let mut rx = state.ws_manager.add(conn_id.clone(), user_id).await;
    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientCommand>(text.as_str()) {
                    Ok(command) => dispatch(&state, &conn_id, user_id, command)
                        .await
                        .unwrap_or_else(|e| error_frame(&e)),
                    Err(e) => ServerMessage::error("BAD_REQUEST", e.to_string()),
                };
                reply_to(&state, &conn_id, &reply).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Apply one client command. The caller's role is resolved again for every
/// command.
pub(crate) async fn dispatch(
    state: &AppState,
    conn_id: &str,
    user_id: DbId,
    command: ClientCommand,
) -> AppResult<ServerMessage> {
    let identity = AccessResolver::resolve(state.store.as_ref(), user_id).await?;

    let (topic, owner) = match command {
        ClientCommand::WatchTickets => {
            AccessResolver::check(&identity, Requirement::Authenticated)?;
            // Customers only hear about their own tickets.
            let owner = (!identity.is_staff()).then_some(user_id);
            (Topic::table(Table::Tickets), owner)
        }
        ClientCommand::WatchMessages { ticket_id } => {
            state.tickets().get(&identity, ticket_id).await?;
            (Topic::scoped(Table::Messages, ticket_id), None)
        }
        ClientCommand::Unwatch => {
            state.ws_manager.clear_watch(conn_id).await;
            return Ok(ServerMessage::Unwatched);
        }
    };

    let sender = state
        .ws_manager
        .sender(conn_id)
        .await
        .ok_or_else(|| AppError::InternalError(format!("connection {conn_id} is gone")))?;

    // Subscribe before spawning so nothing published after the reply is lost.
    let subscription = state.bus.subscribe(topic);
    let task = tokio::spawn(forward(subscription, sender, owner));
    if !state
        .ws_manager
        .set_watch(conn_id, topic, task.abort_handle())
        .await
    {
        return Err(AppError::InternalError(format!("connection {conn_id} is gone")));
    }

    tracing::debug!(conn_id, user_id, ?topic, "WebSocket watch started");
    Ok(ServerMessage::Watching { topic })
}

/// Push matching events to the connection until the bus closes, the
/// connection goes away or the task is aborted.
async fn forward(mut subscription: Subscription, sender: WsSender, owner: Option<DbId>) {
    loop {
        let frame = match subscription.recv().await {
            Ok(event) if visible_to(&event, owner) => ServerMessage::Change { event },
            Ok(_) => continue,
            Err(RecvError::Lagged(missed)) => ServerMessage::Lagged { missed },
            Err(RecvError::Closed) => break,
        };
        match frame.to_frame() {
            Ok(message) => {
                if sender.send(message).is_err() {
                    break;
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode change frame"),
        }
    }
}

/// Whether an event may be shown to a watcher restricted to `owner`'s rows.
///
/// Rows are matched on `created_by` in the new image, or the old one for
/// deletes. Events that carry neither are withheld.
fn visible_to(event: &ChangeEvent, owner: Option<DbId>) -> bool {
    let Some(owner) = owner else {
        return true;
    };
    event
        .new
        .as_ref()
        .or(event.old.as_ref())
        .and_then(|row| row.get("created_by"))
        .and_then(serde_json::Value::as_i64)
        == Some(owner)
}

/// Same mapping as the HTTP error body, internal details withheld.
fn error_frame(err: &AppError) -> ServerMessage {
    match err {
        AppError::Core(CoreError::NotFound { .. }) | AppError::Store(StoreError::NotFound(_)) => {
            ServerMessage::error("NOT_FOUND", err.to_string())
        }
        AppError::Core(CoreError::Unauthorized(msg)) => ServerMessage::error("UNAUTHORIZED", msg.clone()),
        AppError::Core(CoreError::Forbidden(msg)) => ServerMessage::error("FORBIDDEN", msg.clone()),
        AppError::BadRequest(msg) => ServerMessage::error("BAD_REQUEST", msg.clone()),
        _ => {
            tracing::error!(error = %err, "WebSocket command failed");
            ServerMessage::error("INTERNAL_ERROR", "An internal error occurred")
        }
    }
}

async fn reply_to(state: &AppState, conn_id: &str, reply: &ServerMessage) {
    match reply.to_frame() {
        Ok(message) => {
            state.ws_manager.send_to(conn_id, message).await;
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode WebSocket reply"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_events::ChangeKind;
    use serde_json::json;

    fn ticket_event(created_by: DbId) -> ChangeEvent {
        ChangeEvent::new(Table::Tickets, ChangeKind::Update, 1)
            .with_new(json!({ "id": 1, "created_by": created_by }))
    }

    #[test]
    fn test_unrestricted_watcher_sees_everything() {
        assert!(visible_to(&ticket_event(5), None));
        assert!(visible_to(&ChangeEvent::deleted(Table::Tickets, 1, None), None));
    }

    #[test]
    fn test_owner_sees_only_own_rows() {
        assert!(visible_to(&ticket_event(5), Some(5)));
        assert!(!visible_to(&ticket_event(6), Some(5)));
    }

    #[test]
    fn test_delete_without_owner_is_withheld() {
        assert!(!visible_to(&ChangeEvent::deleted(Table::Tickets, 1, None), Some(5)));
    }
}
