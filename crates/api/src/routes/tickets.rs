use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{assignment, messages, tickets};
use crate::state::AppState;

/// Ticket routes, nested under `/tickets`.
///
/// ```text
/// GET    /                         list_tickets
/// POST   /                         create_ticket
/// GET    /unassigned               unassigned_queue
/// GET    /{id}                     get_ticket
/// PATCH  /{id}                     save_changes
/// DELETE /{id}                     delete_ticket
/// PUT    /{id}/status              update_status
/// PUT    /{id}/priority            update_priority
/// PUT    /{id}/category            update_category
/// PUT    /{id}/title               update_title
/// POST   /{id}/assign              assign_ticket
/// GET    /{id}/recommendation      recommend_assignee
/// GET    /{id}/messages            list_messages
/// POST   /{id}/messages            send_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tickets::list_tickets).post(tickets::create_ticket))
        .route("/unassigned", get(tickets::unassigned_queue))
        .route(
            "/{id}",
            get(tickets::get_ticket)
                .patch(tickets::save_changes)
                .delete(tickets::delete_ticket),
        )
        .route("/{id}/status", put(tickets::update_status))
        .route("/{id}/priority", put(tickets::update_priority))
        .route("/{id}/category", put(tickets::update_category))
        .route("/{id}/title", put(tickets::update_title))
        .route("/{id}/assign", post(assignment::assign_ticket))
        .route("/{id}/recommendation", get(assignment::recommend_assignee))
        .route(
            "/{id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
}
