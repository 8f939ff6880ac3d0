//! Knowledge-base article lifecycle, validation and slug helpers.
//!
//! The review workflow is a small state machine:
//!
//! ```text
//! draft ──submit──▶ pending_approval ──approve──▶ approved ──archive──▶ archived
//!   ▲                      │
//!   └──save_draft── rejected ◀──reject──┘
//! ```
//!
//! Every submission snapshots the article into a new version and opens an
//! approval request referencing it.

use crate::error::CoreError;

crate::define_text_enum! {
    /// Publication status of an article.
    ArticleStatus ("article status") {
        Draft = "draft",
        PendingApproval = "pending_approval",
        Approved = "approved",
        Rejected = "rejected",
        Archived = "archived",
    }
}

crate::define_text_enum! {
    ArticleCategory ("article category") {
        General = "general",
        Product = "product",
        Service = "service",
        Troubleshooting = "troubleshooting",
        Faq = "faq",
        Policy = "policy",
        Other = "other",
    }
}

crate::define_text_enum! {
    /// Status of a single approval request.
    ApprovalStatus ("approval status") {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
    }
}

impl ApprovalStatus {
    /// Article status written together with a resolved request.
    pub fn article_status(self) -> Option<ArticleStatus> {
        match self {
            ApprovalStatus::Approved => Some(ArticleStatus::Approved),
            ApprovalStatus::Rejected => Some(ArticleStatus::Rejected),
            ApprovalStatus::Pending => None,
        }
    }
}

impl Default for ArticleCategory {
    fn default() -> Self {
        ArticleCategory::General
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Actions that move an article through review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    SaveDraft,
    Submit,
    Approve,
    Reject,
    Archive,
}

impl ReviewAction {
    pub fn verb(self) -> &'static str {
        match self {
            ReviewAction::SaveDraft => "save as draft",
            ReviewAction::Submit => "submit",
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::Archive => "archive",
        }
    }

    /// Approval request status recorded when this action resolves a request.
    pub fn resolution(self) -> Option<ApprovalStatus> {
        match self {
            ReviewAction::Approve => Some(ApprovalStatus::Approved),
            ReviewAction::Reject => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

/// Apply `action` to an article in status `from`.
///
/// Returns the resulting status or [`CoreError::InvalidTransition`]. Approval
/// is only reachable through `pending_approval`.
pub fn transition(from: ArticleStatus, action: ReviewAction) -> Result<ArticleStatus, CoreError> {
    use ArticleStatus::*;
    use ReviewAction::*;

    let to = match (from, action) {
        (Draft | Rejected, SaveDraft) => Draft,
        (Draft, Submit) => PendingApproval,
        (PendingApproval, Approve) => Approved,
        (PendingApproval, Reject) => Rejected,
        (Approved, Archive) => Archived,
        _ => {
            return Err(CoreError::InvalidTransition {
                entity: "article",
                from: from.as_str(),
                action: action.verb(),
            })
        }
    };
    Ok(to)
}

impl ArticleStatus {
    /// Whether the article body may be edited in this status.
    pub fn is_editable(self) -> bool {
        matches!(self, ArticleStatus::Draft | ArticleStatus::Rejected)
    }

    /// Whether customers may read the article.
    pub fn is_published(self) -> bool {
        self == ArticleStatus::Approved
    }
}

/// Version number for the next snapshot given the current maximum.
pub fn next_version_number(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |v| v + 1)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Generate a URL-safe slug from an article title.
///
/// Lowercases, maps every non-alphanumeric run to a single hyphen and trims
/// hyphens from both ends.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "article".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Make `base` unique against the slugs already taken.
///
/// Appends `-2`, `-3`, ... until no collision remains.
pub fn unique_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.iter().any(|s| s == candidate))
        .unwrap_or_else(|| base.to_string())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1_000;
pub const MAX_CONTENT_LEN: usize = 100_000;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_NOTE_LEN: usize = 5_000;

/// Validate a title for saving. Drafts may be untitled while in progress.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), CoreError> {
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        return Err(CoreError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(CoreError::Validation(format!(
            "Content must be at most {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate the fields of an article that is being sent for review.
///
/// Title and content must both be non-blank.
pub fn validate_submission(title: &str, content: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation(
            "Title is required to submit for approval".into(),
        ));
    }
    if content.trim().is_empty() {
        return Err(CoreError::Validation(
            "Content is required to submit for approval".into(),
        ));
    }
    validate_title(title)?;
    validate_content(content)
}

/// Trim and deduplicate tags, preserving first-seen order, then validate.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, CoreError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(CoreError::Validation("Tags must not be empty".into()));
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(CoreError::Validation(format!(
                "Each tag must be at most {MAX_TAG_LEN} characters"
            )));
        }
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    if out.len() > MAX_TAGS {
        return Err(CoreError::Validation(format!(
            "A maximum of {MAX_TAGS} tags is allowed"
        )));
    }
    Ok(out)
}

/// Normalise reviewer feedback: blank feedback counts as none.
pub fn normalize_feedback(feedback: Option<&str>) -> Option<String> {
    feedback
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// Feedback is mandatory for rejections.
pub fn require_rejection_feedback(feedback: Option<&str>) -> Result<String, CoreError> {
    normalize_feedback(feedback)
        .ok_or_else(|| CoreError::Validation("Feedback is required when rejecting".into()))
}

/// Validate a free-form reviewer note.
pub fn validate_note(content: &str) -> Result<String, CoreError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Note must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_NOTE_LEN {
        return Err(CoreError::Validation(format!(
            "Note must be at most {MAX_NOTE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -- state machine --

    #[test]
    fn test_draft_submits_to_pending() {
        assert_eq!(
            transition(ArticleStatus::Draft, ReviewAction::Submit).unwrap(),
            ArticleStatus::PendingApproval
        );
    }

    #[test]
    fn test_approve_on_draft_refused() {
        let err = transition(ArticleStatus::Draft, ReviewAction::Approve).unwrap_err();
        assert_matches!(
            err,
            CoreError::InvalidTransition {
                from: "draft",
                action: "approve",
                ..
            }
        );
    }

    #[test]
    fn test_approved_only_reachable_through_pending() {
        for status in ArticleStatus::ALL {
            let result = transition(*status, ReviewAction::Approve);
            if *status == ArticleStatus::PendingApproval {
                assert_eq!(result.unwrap(), ArticleStatus::Approved);
            } else {
                assert!(result.is_err(), "approve allowed from {status}");
            }
        }
    }

    #[test]
    fn test_rejected_article_returns_to_draft() {
        assert_eq!(
            transition(ArticleStatus::Rejected, ReviewAction::SaveDraft).unwrap(),
            ArticleStatus::Draft
        );
        assert!(transition(ArticleStatus::Rejected, ReviewAction::Submit).is_err());
    }

    #[test]
    fn test_archive_only_from_approved() {
        assert_eq!(
            transition(ArticleStatus::Approved, ReviewAction::Archive).unwrap(),
            ArticleStatus::Archived
        );
        assert!(transition(ArticleStatus::Draft, ReviewAction::Archive).is_err());
        assert!(transition(ArticleStatus::Archived, ReviewAction::SaveDraft).is_err());
    }

    #[test]
    fn test_pending_is_not_editable() {
        assert!(!ArticleStatus::PendingApproval.is_editable());
        assert!(ArticleStatus::Rejected.is_editable());
    }

    #[test]
    fn test_version_numbers_start_at_one() {
        assert_eq!(next_version_number(None), 1);
        assert_eq!(next_version_number(Some(1)), 2);
        assert_eq!(next_version_number(Some(41)), 42);
    }

    // -- slugs --

    #[test]
    fn test_slug_collapses_punctuation() {
        assert_eq!(generate_slug("Reset your  Password!"), "reset-your-password");
        assert_eq!(generate_slug("--FAQ: Billing--"), "faq-billing");
    }

    #[test]
    fn test_slug_of_symbols_falls_back() {
        assert_eq!(generate_slug("???"), "article");
    }

    #[test]
    fn test_unique_slug_appends_counter() {
        let taken = vec!["billing".to_string(), "billing-2".to_string()];
        assert_eq!(unique_slug("billing", &taken), "billing-3");
        assert_eq!(unique_slug("refunds", &taken), "refunds");
    }

    // -- validation --

    #[test]
    fn test_submission_requires_title_and_content() {
        assert!(validate_submission("", "body").is_err());
        assert!(validate_submission("Title", "   ").is_err());
        assert!(validate_submission("Title", "body").is_ok());
    }

    #[test]
    fn test_tags_deduplicated_and_trimmed() {
        let tags = vec![" login ".to_string(), "login".to_string(), "sso".to_string()];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["login", "sso"]);
    }

    #[test]
    fn test_too_many_tags_rejected() {
        let tags: Vec<String> = (0..21).map(|i| format!("t{i}")).collect();
        assert!(normalize_tags(&tags).is_err());
    }

    #[test]
    fn test_blank_feedback_is_none() {
        assert_eq!(normalize_feedback(Some("  ")), None);
        assert_eq!(normalize_feedback(Some(" ok ")).as_deref(), Some("ok"));
        assert!(require_rejection_feedback(None).is_err());
        assert!(require_rejection_feedback(Some("")).is_err());
    }
}
