//! Knowledge-base articles and their review workflow.
//!
//! ```text
//! draft ──submit──▶ pending_approval ──approve──▶ approved ──archive──▶ archived
//!   ▲                      │
//!   └──save draft── rejected ◀──reject──┘
//! ```
//!
//! Every status check runs twice: once here against the row just read, so
//! the caller gets a precise error, and once in the store as a guarded
//! update, so a concurrent change cannot slip through.

use std::sync::Arc;

use helpdesk_core::article::{
    generate_slug, normalize_feedback, normalize_tags, require_rejection_feedback, transition,
    unique_slug, validate_content, validate_description, validate_note, validate_submission,
    validate_title, ApprovalStatus, ArticleStatus, ReviewAction,
};
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::types::DbId;
use helpdesk_db::models::approval_request::{
    ApprovalRequest, ResolveApproval, Resolution, ReviewDecision, SubmitArticle, Submission,
};
use helpdesk_db::models::article::{Article, ArticleFilter, CreateArticle, NewArticle, UpdateArticle};
use helpdesk_db::models::article_note::ArticleNote;
use helpdesk_db::models::article_version::ArticleVersion;
use helpdesk_db::Store;

use crate::access::{AccessResolver, Requirement};
use crate::error::{store_failure, DeskError, DeskResult};

#[derive(Clone)]
pub struct ArticleReview {
    store: Arc<dyn Store>,
}

impl ArticleReview {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // -- authoring ---------------------------------------------------------

    /// Create a draft. The slug is derived from the title and made unique.
    pub async fn create(&self, caller: &ResolvedIdentity, input: CreateArticle) -> DeskResult<Article> {
        let created_by = AccessResolver::check(caller, Requirement::Staff)?;
        let title = input.title.trim().to_string();
        validate_title(&title)?;
        let description = normalize_feedback(input.description.as_deref());
        validate_description(description.as_deref())?;
        validate_content(&input.content)?;
        let tags = normalize_tags(&input.tags)?;

        let base = generate_slug(&title);
        let taken = self
            .store
            .slugs_like(&base)
            .await
            .map_err(store_failure("slugs_like"))?;
        let slug = unique_slug(&base, &taken);

        let article = self
            .store
            .insert_article(&NewArticle {
                title,
                description,
                content: input.content,
                category: input.category.unwrap_or_default(),
                is_faq: input.is_faq.unwrap_or(false),
                slug,
                tags,
                created_by,
            })
            .await
            .map_err(store_failure("insert_article"))?;

        tracing::info!(article_id = article.id, slug = %article.slug, created_by, "Article created");
        Ok(article)
    }

    /// Save edits; the article lands (or stays) in `draft`.
    pub async fn save_draft(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        mut patch: UpdateArticle,
    ) -> DeskResult<Article> {
        AccessResolver::check(caller, Requirement::Staff)?;
        if let Some(title) = patch.title.as_mut() {
            *title = title.trim().to_string();
            validate_title(title)?;
        }
        validate_description(patch.description.as_deref())?;
        if let Some(content) = &patch.content {
            validate_content(content)?;
        }
        if let Some(tags) = &patch.tags {
            patch.tags = Some(normalize_tags(tags)?);
        }

        let article = self.find(id).await?;
        let to = transition(article.status, ReviewAction::SaveDraft)?;
        let saved = self
            .store
            .save_article(id, &patch, to)
            .await
            .map_err(store_failure("save_article"))?;
        tracing::info!(article_id = id, from = %article.status, "Article draft saved");
        Ok(saved)
    }

    /// Snapshot a new version and open an approval request.
    pub async fn submit(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        input: SubmitArticle,
    ) -> DeskResult<Submission> {
        let submitted_by = AccessResolver::check(caller, Requirement::Staff)?;
        let article = self.find(id).await?;
        transition(article.status, ReviewAction::Submit)?;
        validate_submission(&article.title, &article.content)?;

        let summary = normalize_feedback(input.change_summary.as_deref());
        let submission = self
            .store
            .submit_for_approval(id, submitted_by, summary.as_deref())
            .await
            .map_err(store_failure("submit_for_approval"))?;

        tracing::info!(
            article_id = id,
            version = submission.version.version_number,
            request_id = submission.request.id,
            "Article submitted for approval"
        );
        Ok(submission)
    }

    // -- review ------------------------------------------------------------

    pub async fn approve(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        decision: ReviewDecision,
    ) -> DeskResult<Resolution> {
        let feedback = normalize_feedback(decision.feedback.as_deref());
        self.resolve(caller, id, ReviewAction::Approve, feedback).await
    }

    /// Reject with mandatory feedback.
    pub async fn reject(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        decision: ReviewDecision,
    ) -> DeskResult<Resolution> {
        AccessResolver::check(caller, Requirement::Manager)?;
        let feedback = require_rejection_feedback(decision.feedback.as_deref())?;
        self.resolve(caller, id, ReviewAction::Reject, Some(feedback)).await
    }

    pub async fn archive(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<Article> {
        AccessResolver::check(caller, Requirement::Manager)?;
        let article = self.find(id).await?;
        let to = transition(article.status, ReviewAction::Archive)?;
        let archived = self
            .store
            .set_article_status(id, article.status, to)
            .await
            .map_err(store_failure("set_article_status"))?;
        tracing::info!(article_id = id, "Article archived");
        Ok(archived)
    }

    /// Attach a reviewer note outside of a decision.
    pub async fn add_note(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        content: &str,
    ) -> DeskResult<ArticleNote> {
        let reviewer = AccessResolver::check(caller, Requirement::Manager)?;
        let content = validate_note(content)?;
        self.find(id).await?;
        self.store
            .insert_note(id, reviewer, &content)
            .await
            .map_err(store_failure("insert_note"))
    }

    async fn resolve(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        action: ReviewAction,
        feedback: Option<String>,
    ) -> DeskResult<Resolution> {
        let reviewer_id = AccessResolver::check(caller, Requirement::Manager)?;
        let article = self.find(id).await?;
        transition(article.status, action)?;
        let decision = action.resolution().unwrap_or(ApprovalStatus::Pending);

        let resolution = self
            .store
            .resolve_approval(&ResolveApproval {
                article_id: id,
                decision,
                reviewer_id,
                feedback,
            })
            .await
            .map_err(store_failure("resolve_approval"))?;

        tracing::info!(
            article_id = id,
            request_id = resolution.request.id,
            decision = %decision,
            reviewer_id,
            "Approval request resolved"
        );
        Ok(resolution)
    }

    // -- reading -----------------------------------------------------------

    /// Reader fetch: counts one view. Customers only see approved articles.
    ///
    /// A failed view-count bump is logged and the article still returned.
    pub async fn read(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<Article> {
        AccessResolver::check(caller, Requirement::Authenticated)?;
        let mut article = self.find(id).await?;
        if !caller.is_staff() && !article.status.is_published() {
            return Err(DeskError::not_found("article", id));
        }
        match self.store.increment_view_count(id).await {
            Ok(count) => article.view_count = count,
            Err(e) => tracing::warn!(error = %e, article_id = id, "Failed to count article view"),
        }
        Ok(article)
    }

    /// Editor fetch: does not count a view.
    pub async fn load_for_edit(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<Article> {
        AccessResolver::check(caller, Requirement::Staff)?;
        self.find(id).await
    }

    /// Filtered listing. Customers are limited to approved articles.
    pub async fn list(&self, caller: &ResolvedIdentity, mut filter: ArticleFilter) -> DeskResult<Vec<Article>> {
        AccessResolver::check(caller, Requirement::Authenticated)?;
        if !caller.is_staff() {
            filter.statuses = vec![ArticleStatus::Approved];
        }
        self.store
            .list_articles(&filter)
            .await
            .map_err(store_failure("list_articles"))
    }

    /// Articles waiting for a reviewer.
    pub async fn pending(&self, caller: &ResolvedIdentity) -> DeskResult<Vec<Article>> {
        AccessResolver::check(caller, Requirement::Manager)?;
        let filter = ArticleFilter {
            statuses: vec![ArticleStatus::PendingApproval],
            ..Default::default()
        };
        self.store
            .list_articles(&filter)
            .await
            .map_err(store_failure("list_articles"))
    }

    pub async fn versions(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<Vec<ArticleVersion>> {
        AccessResolver::check(caller, Requirement::Staff)?;
        self.find(id).await?;
        self.store
            .list_versions(id)
            .await
            .map_err(store_failure("list_versions"))
    }

    pub async fn approvals(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
    ) -> DeskResult<Vec<ApprovalRequest>> {
        AccessResolver::check(caller, Requirement::Staff)?;
        self.find(id).await?;
        self.store
            .list_approval_requests(id)
            .await
            .map_err(store_failure("list_approval_requests"))
    }

    pub async fn notes(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<Vec<ArticleNote>> {
        AccessResolver::check(caller, Requirement::Staff)?;
        self.find(id).await?;
        self.store
            .list_notes(id)
            .await
            .map_err(store_failure("list_notes"))
    }

    async fn find(&self, id: DbId) -> DeskResult<Article> {
        self.store
            .find_article(id)
            .await
            .map_err(store_failure("find_article"))?
            .ok_or_else(|| DeskError::not_found("article", id))
    }
}
