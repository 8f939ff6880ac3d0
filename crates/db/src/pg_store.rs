//! PostgreSQL implementation of the [`store`](crate::store) ports.
//!
//! Single-statement operations delegate to the repositories. Compound
//! operations run in one transaction so a failure part-way leaves nothing
//! behind.

use async_trait::async_trait;
use helpdesk_core::article::ArticleStatus;
use helpdesk_core::message::SenderType;
use helpdesk_core::types::DbId;

use crate::models::approval_request::{ApprovalRequest, ResolveApproval, Resolution, Submission};
use crate::models::article::{Article, ArticleFilter, NewArticle, UpdateArticle};
use crate::models::article_note::ArticleNote;
use crate::models::article_version::ArticleVersion;
use crate::models::customer::Customer;
use crate::models::employee::{Employee, EmployeeWithLoad, MetricCounts};
use crate::models::message::{Message, NewMessage};
use crate::models::ticket::{AssignTicket, NewTicket, Ticket, TicketScope, UpdateTicket};
use crate::repositories::{
    ApprovalRequestRepo, ArticleNoteRepo, ArticleRepo, ArticleVersionRepo, CustomerRepo,
    EmployeeRepo, MessageRepo, TicketRepo,
};
use crate::store::{ArticleStore, DirectoryStore, MessageStore, Store, StoreError, TicketStore};
use crate::DbPool;

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn insert_ticket(&self, input: &NewTicket) -> Result<Ticket, StoreError> {
        Ok(TicketRepo::create(&self.pool, input).await?)
    }

    async fn find_ticket(&self, id: DbId) -> Result<Option<Ticket>, StoreError> {
        Ok(TicketRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_tickets(&self, scope: TicketScope) -> Result<Vec<Ticket>, StoreError> {
        Ok(TicketRepo::list(&self.pool, scope).await?)
    }

    async fn update_ticket(&self, id: DbId, patch: &UpdateTicket) -> Result<Ticket, StoreError> {
        TicketRepo::update(&self.pool, id, patch)
            .await?
            .ok_or_else(|| StoreError::not_found("ticket", id))
    }

    async fn touch_ticket(&self, id: DbId) -> Result<Ticket, StoreError> {
        TicketRepo::touch(&self.pool, id)
            .await?
            .ok_or_else(|| StoreError::not_found("ticket", id))
    }

    async fn assign_ticket(&self, input: &AssignTicket) -> Result<(Ticket, Message), StoreError> {
        let mut tx = self.pool.begin().await?;

        TicketRepo::set_assignee(&mut *tx, input.ticket_id, input.assignee_id)
            .await?
            .ok_or_else(|| StoreError::not_found("ticket", input.ticket_id))?;

        let notice = MessageRepo::create(
            &mut *tx,
            &NewMessage {
                ticket_id: input.ticket_id,
                message: input.notice.clone(),
                created_by: input.assigned_by,
                sender_type: SenderType::Employee,
                is_system_message: true,
            },
        )
        .await?;

        let ticket = TicketRepo::touch(&mut *tx, input.ticket_id)
            .await?
            .ok_or_else(|| StoreError::not_found("ticket", input.ticket_id))?;

        tx.commit().await?;
        Ok((ticket, notice))
    }

    async fn delete_ticket(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(TicketRepo::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert_message(&self, input: &NewMessage) -> Result<Message, StoreError> {
        Ok(MessageRepo::create(&self.pool, input).await?)
    }

    async fn list_messages(&self, ticket_id: DbId) -> Result<Vec<Message>, StoreError> {
        Ok(MessageRepo::list_by_ticket(&self.pool, ticket_id).await?)
    }

    async fn delete_messages_for_ticket(&self, ticket_id: DbId) -> Result<u64, StoreError> {
        Ok(MessageRepo::delete_by_ticket(&self.pool, ticket_id).await?)
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn find_employee(&self, id: DbId) -> Result<Option<Employee>, StoreError> {
        Ok(EmployeeRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_customer(&self, id: DbId) -> Result<Option<Customer>, StoreError> {
        Ok(CustomerRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_employees_with_load(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<EmployeeWithLoad>, StoreError> {
        Ok(EmployeeRepo::list_with_load(&self.pool, department).await?)
    }

    async fn employee_metric_counts(&self, id: DbId) -> Result<MetricCounts, StoreError> {
        Ok(EmployeeRepo::metric_counts(&self.pool, id).await?)
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn insert_article(&self, input: &NewArticle) -> Result<Article, StoreError> {
        let mut tx = self.pool.begin().await?;
        let article = ArticleRepo::create(&mut *tx, input).await?;
        tx.commit().await?;
        Ok(article)
    }

    async fn find_article(&self, id: DbId) -> Result<Option<Article>, StoreError> {
        Ok(ArticleRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, StoreError> {
        Ok(ArticleRepo::list(&self.pool, filter).await?)
    }

    async fn slugs_like(&self, base: &str) -> Result<Vec<String>, StoreError> {
        Ok(ArticleRepo::slugs_like(&self.pool, base).await?)
    }

    async fn save_article(
        &self,
        id: DbId,
        patch: &UpdateArticle,
        status: ArticleStatus,
    ) -> Result<Article, StoreError> {
        let mut tx = self.pool.begin().await?;
        let article = ArticleRepo::update(&mut *tx, id, patch, status)
            .await?
            .ok_or_else(|| StoreError::not_found("article", id))?;
        tx.commit().await?;
        Ok(article)
    }

    async fn set_article_status(
        &self,
        id: DbId,
        from: ArticleStatus,
        to: ArticleStatus,
    ) -> Result<Article, StoreError> {
        match ArticleRepo::transition(&self.pool, id, from, to).await? {
            Some(_) => ArticleRepo::find_by_id(&self.pool, id)
                .await?
                .ok_or_else(|| StoreError::not_found("article", id)),
            None => Err(self.missing_or_moved(id, from).await),
        }
    }

    async fn submit_for_approval(
        &self,
        article_id: DbId,
        submitted_by: DbId,
        change_summary: Option<&str>,
    ) -> Result<Submission, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Locks the row for version numbering and guards the transition.
        ArticleRepo::transition(
            &mut *tx,
            article_id,
            ArticleStatus::Draft,
            ArticleStatus::PendingApproval,
        )
        .await?
        .ok_or_else(|| StoreError::Conflict(format!("article {article_id} is not a draft")))?;

        let version =
            ArticleVersionRepo::snapshot(&mut *tx, article_id, submitted_by, change_summary)
                .await?;
        let request =
            ApprovalRequestRepo::create(&mut *tx, article_id, version.id, submitted_by).await?;
        let article = ArticleRepo::find_by_id(&mut *tx, article_id)
            .await?
            .ok_or_else(|| StoreError::not_found("article", article_id))?;

        tx.commit().await?;
        Ok(Submission {
            article,
            version,
            request,
        })
    }

    async fn resolve_approval(&self, input: &ResolveApproval) -> Result<Resolution, StoreError> {
        let target = input.decision.article_status().ok_or_else(|| {
            StoreError::Conflict("an approval can only be resolved as approved or rejected".into())
        })?;
        let mut tx = self.pool.begin().await?;

        let request = ApprovalRequestRepo::resolve_pending(
            &mut *tx,
            input.article_id,
            input.decision,
            input.reviewer_id,
            input.feedback.as_deref(),
        )
        .await?
        .ok_or_else(|| {
            StoreError::NotFound(format!(
                "pending approval request for article {}",
                input.article_id
            ))
        })?;

        ArticleRepo::transition(
            &mut *tx,
            input.article_id,
            ArticleStatus::PendingApproval,
            target,
        )
        .await?
        .ok_or_else(|| {
            StoreError::Conflict(format!(
                "article {} is not pending approval",
                input.article_id
            ))
        })?;

        let note = match input.feedback.as_deref() {
            Some(feedback) => Some(
                ArticleNoteRepo::create(&mut *tx, input.article_id, input.reviewer_id, feedback)
                    .await?,
            ),
            None => None,
        };

        let article = ArticleRepo::find_by_id(&mut *tx, input.article_id)
            .await?
            .ok_or_else(|| StoreError::not_found("article", input.article_id))?;

        tx.commit().await?;
        Ok(Resolution {
            article,
            request,
            note,
        })
    }

    async fn increment_view_count(&self, article_id: DbId) -> Result<i64, StoreError> {
        ArticleRepo::increment_view_count(&self.pool, article_id)
            .await?
            .ok_or_else(|| StoreError::not_found("article", article_id))
    }

    async fn list_versions(&self, article_id: DbId) -> Result<Vec<ArticleVersion>, StoreError> {
        Ok(ArticleVersionRepo::list_by_article(&self.pool, article_id).await?)
    }

    async fn list_approval_requests(
        &self,
        article_id: DbId,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        Ok(ApprovalRequestRepo::list_by_article(&self.pool, article_id).await?)
    }

    async fn insert_note(
        &self,
        article_id: DbId,
        created_by: DbId,
        content: &str,
    ) -> Result<ArticleNote, StoreError> {
        Ok(ArticleNoteRepo::create(&self.pool, article_id, created_by, content).await?)
    }

    async fn list_notes(&self, article_id: DbId) -> Result<Vec<ArticleNote>, StoreError> {
        Ok(ArticleNoteRepo::list_by_article(&self.pool, article_id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

impl PgStore {
    /// Tell apart "no such article" from "article moved on" after a guarded
    /// transition matched no row.
    async fn missing_or_moved(&self, id: DbId, expected: ArticleStatus) -> StoreError {
        match ArticleRepo::find_by_id(&self.pool, id).await {
            Ok(Some(article)) => StoreError::Conflict(format!(
                "article {id} is {} (expected {expected})",
                article.status
            )),
            Ok(None) => StoreError::not_found("article", id),
            Err(e) => e.into(),
        }
    }
}
