use axum::routing::{get, post};
use axum::Router;

use crate::handlers::articles;
use crate::state::AppState;

/// Knowledge-base routes, nested under `/articles`.
///
/// ```text
/// GET    /                         list_articles
/// POST   /                         create_article
/// GET    /pending                  pending_articles
/// GET    /{id}                     read_article
/// PUT    /{id}                     save_draft
/// GET    /{id}/edit                edit_article
/// POST   /{id}/submit              submit_article
/// POST   /{id}/approve             approve_article
/// POST   /{id}/reject              reject_article
/// POST   /{id}/archive             archive_article
/// GET    /{id}/versions            list_versions
/// GET    /{id}/approvals           list_approvals
/// GET    /{id}/notes               list_notes
/// POST   /{id}/notes               add_note
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(articles::list_articles).post(articles::create_article))
        .route("/pending", get(articles::pending_articles))
        .route(
            "/{id}",
            get(articles::read_article).put(articles::save_draft),
        )
        .route("/{id}/edit", get(articles::edit_article))
        .route("/{id}/submit", post(articles::submit_article))
        .route("/{id}/approve", post(articles::approve_article))
        .route("/{id}/reject", post(articles::reject_article))
        .route("/{id}/archive", post(articles::archive_article))
        .route("/{id}/versions", get(articles::list_versions))
        .route("/{id}/approvals", get(articles::list_approvals))
        .route(
            "/{id}/notes",
            get(articles::list_notes).post(articles::add_note),
        )
}
