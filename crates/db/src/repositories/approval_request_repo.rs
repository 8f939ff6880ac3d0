//! Repository for the `approval_requests` table.

use helpdesk_core::article::ApprovalStatus;
use helpdesk_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::approval_request::ApprovalRequest;

const COLUMNS: &str = "id, article_id, version_id, submitted_by, submitted_at, status, \
    reviewed_by, reviewed_at, feedback";

pub struct ApprovalRequestRepo;

impl ApprovalRequestRepo {
    /// Open a pending request for a version. The partial unique index
    /// `uq_approval_requests_one_pending` rejects a second pending request.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        article_id: DbId,
        version_id: DbId,
        submitted_by: DbId,
    ) -> Result<ApprovalRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO approval_requests (article_id, version_id, submitted_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApprovalRequest>(&query)
            .bind(article_id)
            .bind(version_id)
            .bind(submitted_by)
            .fetch_one(executor)
            .await
    }

    /// Resolve the article's pending request. Returns `None` when there is
    /// no pending request (already resolved, or never submitted).
    pub async fn resolve_pending<'e, E: PgExecutor<'e>>(
        executor: E,
        article_id: DbId,
        decision: ApprovalStatus,
        reviewer_id: DbId,
        feedback: Option<&str>,
    ) -> Result<Option<ApprovalRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE approval_requests SET
                status = $2,
                reviewed_by = $3,
                reviewed_at = NOW(),
                feedback = $4
             WHERE article_id = $1 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApprovalRequest>(&query)
            .bind(article_id)
            .bind(decision.as_str())
            .bind(reviewer_id)
            .bind(feedback)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ApprovalRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM approval_requests WHERE id = $1");
        sqlx::query_as::<_, ApprovalRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Approval history of an article, newest first.
    pub async fn list_by_article(
        pool: &PgPool,
        article_id: DbId,
    ) -> Result<Vec<ApprovalRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM approval_requests
             WHERE article_id = $1
             ORDER BY submitted_at DESC, id DESC"
        );
        sqlx::query_as::<_, ApprovalRequest>(&query)
            .bind(article_id)
            .fetch_all(pool)
            .await
    }
}
