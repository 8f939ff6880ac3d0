//! Knowledge-base article model and DTOs.

use helpdesk_core::article::{ArticleCategory, ArticleStatus};
use helpdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `articles` table, with its tags folded in from
/// `article_tags`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Article {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub status: ArticleStatus,
    #[sqlx(try_from = "String")]
    pub category: ArticleCategory,
    pub is_faq: bool,
    pub slug: String,
    pub view_count: i64,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub published_at: Option<Timestamp>,
    pub tags: Vec<String>,
}

/// DTO for creating an article. New articles always start as drafts.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticle {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    pub category: Option<ArticleCategory>,
    pub is_faq: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Insert payload assembled by the review workflow (validated, slugged).
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub category: ArticleCategory,
    pub is_faq: bool,
    pub slug: String,
    pub tags: Vec<String>,
    pub created_by: DbId,
}

/// DTO for editing an article. `tags`, when present, replaces the whole set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<ArticleCategory>,
    pub is_faq: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Listing filters. Empty `statuses` means any status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleFilter {
    #[serde(default)]
    pub statuses: Vec<ArticleStatus>,
    pub category: Option<ArticleCategory>,
    pub is_faq: Option<bool>,
    pub created_by: Option<DbId>,
    /// Case-insensitive substring match over title, description and content.
    pub search: Option<String>,
}

impl ArticleFilter {
    /// Whether `article` passes every filter.
    pub fn matches(&self, article: &Article) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&article.status) {
            return false;
        }
        if self.category.is_some_and(|c| c != article.category) {
            return false;
        }
        if self.is_faq.is_some_and(|f| f != article.is_faq) {
            return false;
        }
        if self.created_by.is_some_and(|u| u != article.created_by) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                article.title.to_lowercase().contains(&needle)
                    || article
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || article.content.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}
