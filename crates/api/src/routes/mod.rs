pub mod articles;
pub mod health;
pub mod tickets;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the plain HTTP part of the `/api/v1` route tree.
///
/// ```text
/// /me                          resolved identity of the caller
/// /employees                   roster with open-ticket load (staff)
/// /employees/{id}/metrics      per-employee figures (self, or manager)
/// /tickets/...                 see [`tickets::router`]
/// /articles/...                see [`articles::router`]
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::identity::me))
        .route("/employees", get(handlers::assignment::list_employees))
        .route(
            "/employees/{id}/metrics",
            get(handlers::assignment::employee_metrics),
        )
        .nest("/tickets", tickets::router())
        .nest("/articles", articles::router())
}

/// `/api/v1/ws`: WebSocket upgrades (watch tickets / a ticket's messages).
///
/// Mounted outside the request timeout; a subscription lives as long as the
/// socket does.
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/api/v1/ws", get(ws::ws_handler))
}
