//! Article version snapshots.
//!
//! Versions are immutable; one is written on every submission for review.

use helpdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `article_versions` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ArticleVersion {
    pub id: DbId,
    pub article_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub version_number: i32,
    pub change_summary: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
}
