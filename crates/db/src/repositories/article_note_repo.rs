use helpdesk_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::article_note::ArticleNote;

const COLUMNS: &str = "id, article_id, content, created_by, created_at";

/// Reviewer notes attached to articles.
pub struct ArticleNoteRepo;

impl ArticleNoteRepo {
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        article_id: DbId,
        created_by: DbId,
        content: &str,
    ) -> Result<ArticleNote, sqlx::Error> {
        let query = format!(
            "INSERT INTO article_notes (article_id, content, created_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ArticleNote>(&query)
            .bind(article_id)
            .bind(content)
            .bind(created_by)
            .fetch_one(executor)
            .await
    }

    /// Notes of an article, oldest first.
    pub async fn list_by_article(pool: &PgPool, article_id: DbId) -> Result<Vec<ArticleNote>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM article_notes
             WHERE article_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ArticleNote>(&query)
            .bind(article_id)
            .fetch_all(pool)
            .await
    }
}
