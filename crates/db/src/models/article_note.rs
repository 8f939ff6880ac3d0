use helpdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `article_notes` table: reviewer commentary on an article.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ArticleNote {
    pub id: DbId,
    pub article_id: DbId,
    pub content: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

/// Request body for adding a note.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticleNote {
    pub content: String,
}
