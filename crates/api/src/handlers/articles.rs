//! Handlers for knowledge-base articles and their review workflow.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use helpdesk_core::article::{ArticleCategory, ArticleStatus};
use helpdesk_core::types::DbId;
use helpdesk_db::models::approval_request::{ReviewDecision, SubmitArticle};
use helpdesk_db::models::article::{ArticleFilter, CreateArticle, UpdateArticle};
use helpdesk_db::models::article_note::CreateArticleNote;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireManager, RequireStaff};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /articles`.
///
/// `status` takes a comma-separated list, e.g. `?status=draft,rejected`.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleListParams {
    pub status: Option<String>,
    pub category: Option<ArticleCategory>,
    pub is_faq: Option<bool>,
    pub created_by: Option<DbId>,
    pub search: Option<String>,
}

impl ArticleListParams {
    fn into_filter(self) -> AppResult<ArticleFilter> {
        let statuses = match self.status.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<ArticleStatus>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
            None => Vec::new(),
        };
        Ok(ArticleFilter {
            statuses,
            category: self.category,
            is_faq: self.is_faq,
            created_by: self.created_by,
            search: self.search,
        })
    }
}

/// GET /api/v1/articles
///
/// Customers only ever see approved articles, whatever `status` asks for.
pub async fn list_articles(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ArticleListParams>,
) -> AppResult<impl IntoResponse> {
    let filter = params.into_filter()?;
    let articles = state.articles().list(&auth.identity, filter).await?;
    Ok(Json(DataResponse { data: articles }))
}

/// POST /api/v1/articles
///
/// New articles always start as drafts.
pub async fn create_article(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<CreateArticle>,
) -> AppResult<impl IntoResponse> {
    let article = state.articles().create(&auth.identity, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: article })))
}

/// GET /api/v1/articles/pending
pub async fn pending_articles(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let articles = state.articles().pending(&auth.identity).await?;
    Ok(Json(DataResponse { data: articles }))
}

/// GET /api/v1/articles/{id}
///
/// Reader fetch; counts one view.
pub async fn read_article(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let article = state.articles().read(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: article }))
}

/// GET /api/v1/articles/{id}/edit
///
/// Editor fetch; does not count a view.
pub async fn edit_article(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let article = state.articles().load_for_edit(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: article }))
}

/// PUT /api/v1/articles/{id}
pub async fn save_draft(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(patch): Json<UpdateArticle>,
) -> AppResult<impl IntoResponse> {
    let article = state.articles().save_draft(&auth.identity, id, patch).await?;
    Ok(Json(DataResponse { data: article }))
}

/// POST /api/v1/articles/{id}/submit
///
/// Snapshots a version and opens the approval request in one unit.
pub async fn submit_article(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitArticle>,
) -> AppResult<impl IntoResponse> {
    let submission = state.articles().submit(&auth.identity, id, input).await?;
    tracing::info!(
        user_id = auth.user_id,
        article_id = id,
        version = submission.version.version_number,
        "Article submitted via API"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: submission })))
}

/// POST /api/v1/articles/{id}/approve
pub async fn approve_article(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(decision): Json<ReviewDecision>,
) -> AppResult<impl IntoResponse> {
    let resolution = state.articles().approve(&auth.identity, id, decision).await?;
    Ok(Json(DataResponse { data: resolution }))
}

/// POST /api/v1/articles/{id}/reject
///
/// `feedback` is required.
pub async fn reject_article(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(decision): Json<ReviewDecision>,
) -> AppResult<impl IntoResponse> {
    let resolution = state.articles().reject(&auth.identity, id, decision).await?;
    Ok(Json(DataResponse { data: resolution }))
}

/// POST /api/v1/articles/{id}/archive
pub async fn archive_article(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let article = state.articles().archive(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: article }))
}

/// GET /api/v1/articles/{id}/versions
///
/// Newest first.
pub async fn list_versions(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let versions = state.articles().versions(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// GET /api/v1/articles/{id}/approvals
pub async fn list_approvals(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let requests = state.articles().approvals(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /api/v1/articles/{id}/notes
pub async fn list_notes(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let notes = state.articles().notes(&auth.identity, id).await?;
    Ok(Json(DataResponse { data: notes }))
}

/// POST /api/v1/articles/{id}/notes
pub async fn add_note(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateArticleNote>,
) -> AppResult<impl IntoResponse> {
    let note = state
        .articles()
        .add_note(&auth.identity, id, &input.content)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: note })))
}
