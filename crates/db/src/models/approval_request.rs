//! Approval request model and review DTOs.

use helpdesk_core::article::ApprovalStatus;
use helpdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::article::Article;
use super::article_note::ArticleNote;
use super::article_version::ArticleVersion;

/// A row from the `approval_requests` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: DbId,
    pub article_id: DbId,
    pub version_id: DbId,
    pub submitted_by: DbId,
    pub submitted_at: Timestamp,
    #[sqlx(try_from = "String")]
    pub status: ApprovalStatus,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub feedback: Option<String>,
}

/// Request body for approve / reject.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewDecision {
    pub feedback: Option<String>,
}

/// Request body for submitting an article.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitArticle {
    pub change_summary: Option<String>,
}

/// Resolution of the pending request, applied atomically with the article
/// status change.
#[derive(Debug, Clone)]
pub struct ResolveApproval {
    pub article_id: DbId,
    pub decision: ApprovalStatus,
    pub reviewer_id: DbId,
    pub feedback: Option<String>,
}

/// Everything written by one submission.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub article: Article,
    pub version: ArticleVersion,
    pub request: ApprovalRequest,
}

/// Everything written by one approve / reject decision.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub article: Article,
    pub request: ApprovalRequest,
    pub note: Option<ArticleNote>,
}
