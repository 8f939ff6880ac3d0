//! Store ports.
//!
//! The adapters, views and HTTP handlers program against these traits rather
//! than a concrete pool, so the same workflows run over PostgreSQL
//! ([`PgStore`](crate::PgStore)) or an in-memory store in tests.
//!
//! Compound operations (`assign_ticket`, `submit_for_approval`,
//! `resolve_approval`) are all-or-nothing: an implementation must either
//! apply every write or none of them.

use async_trait::async_trait;
use helpdesk_core::article::ArticleStatus;
use helpdesk_core::types::DbId;

use crate::models::approval_request::{ApprovalRequest, ResolveApproval, Resolution, Submission};
use crate::models::article::{Article, ArticleFilter, NewArticle, UpdateArticle};
use crate::models::article_note::ArticleNote;
use crate::models::article_version::ArticleVersion;
use crate::models::customer::Customer;
use crate::models::employee::{Employee, EmployeeWithLoad, MetricCounts};
use crate::models::message::{Message, NewMessage};
use crate::models::ticket::{AssignTicket, NewTicket, Ticket, TicketScope, UpdateTicket};

/// Failure reported by a store implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The write lost a race or violated a uniqueness rule.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &str, id: DbId) -> Self {
        StoreError::NotFound(format!("{entity} {id}"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".into()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(
                    db_err
                        .constraint()
                        .map(|c| format!("unique constraint {c}"))
                        .unwrap_or_else(|| "duplicate value".into()),
                ),
                Some("23503") => StoreError::Conflict("referenced row does not exist".into()),
                Some("23514") => StoreError::Conflict("check constraint violated".into()),
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert_ticket(&self, input: &NewTicket) -> Result<Ticket, StoreError>;

    async fn find_ticket(&self, id: DbId) -> Result<Option<Ticket>, StoreError>;

    async fn list_tickets(&self, scope: TicketScope) -> Result<Vec<Ticket>, StoreError>;

    /// Patch the given fields. Does not move `updated_at`.
    async fn update_ticket(&self, id: DbId, patch: &UpdateTicket) -> Result<Ticket, StoreError>;

    /// Advance `updated_at`; strictly greater than its previous value.
    async fn touch_ticket(&self, id: DbId) -> Result<Ticket, StoreError>;

    /// Assign, move to `in_progress` unless closed, post the notice as a
    /// system message and touch the ticket, in one unit.
    async fn assign_ticket(&self, input: &AssignTicket) -> Result<(Ticket, Message), StoreError>;

    /// Delete the ticket row. Returns `false` when it did not exist.
    async fn delete_ticket(&self, id: DbId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, input: &NewMessage) -> Result<Message, StoreError>;

    /// Messages of one ticket, oldest first.
    async fn list_messages(&self, ticket_id: DbId) -> Result<Vec<Message>, StoreError>;

    /// Remove every message of a ticket, returning how many were deleted.
    async fn delete_messages_for_ticket(&self, ticket_id: DbId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_employee(&self, id: DbId) -> Result<Option<Employee>, StoreError>;

    async fn find_customer(&self, id: DbId) -> Result<Option<Customer>, StoreError>;

    /// Roster with open-ticket counts, least loaded first.
    async fn list_employees_with_load(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<EmployeeWithLoad>, StoreError>;

    /// Ticket, message and article counts for one employee. Zeroes for an
    /// id with no activity.
    async fn employee_metric_counts(&self, id: DbId) -> Result<MetricCounts, StoreError>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert_article(&self, input: &NewArticle) -> Result<Article, StoreError>;

    async fn find_article(&self, id: DbId) -> Result<Option<Article>, StoreError>;

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, StoreError>;

    /// Slugs equal to `base` or of the form `base-N`.
    async fn slugs_like(&self, base: &str) -> Result<Vec<String>, StoreError>;

    /// Apply an edit and set the status (edits always land as drafts).
    async fn save_article(
        &self,
        id: DbId,
        patch: &UpdateArticle,
        status: ArticleStatus,
    ) -> Result<Article, StoreError>;

    /// Move `id` from `from` to `to`; `Conflict` when it is no longer in `from`.
    async fn set_article_status(
        &self,
        id: DbId,
        from: ArticleStatus,
        to: ArticleStatus,
    ) -> Result<Article, StoreError>;

    /// Snapshot the article as version `max + 1`, open a pending approval
    /// request for it and move the article to `pending_approval`.
    async fn submit_for_approval(
        &self,
        article_id: DbId,
        submitted_by: DbId,
        change_summary: Option<&str>,
    ) -> Result<Submission, StoreError>;

    /// Resolve the article's pending request and update the article status
    /// to match; feedback is also stored as a note.
    async fn resolve_approval(&self, input: &ResolveApproval) -> Result<Resolution, StoreError>;

    /// Returns the new view count.
    async fn increment_view_count(&self, article_id: DbId) -> Result<i64, StoreError>;

    async fn list_versions(&self, article_id: DbId) -> Result<Vec<ArticleVersion>, StoreError>;

    async fn list_approval_requests(
        &self,
        article_id: DbId,
    ) -> Result<Vec<ApprovalRequest>, StoreError>;

    async fn insert_note(
        &self,
        article_id: DbId,
        created_by: DbId,
        content: &str,
    ) -> Result<ArticleNote, StoreError>;

    async fn list_notes(&self, article_id: DbId) -> Result<Vec<ArticleNote>, StoreError>;
}

/// The full backing store.
#[async_trait]
pub trait Store: TicketStore + MessageStore + DirectoryStore + ArticleStore {
    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
