//! Repository for the `article_versions` table.

use helpdesk_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::article_version::ArticleVersion;

const COLUMNS: &str = "id, article_id, title, description, content, version_number, \
    change_summary, created_by, created_at";

/// Versions are append-only; there is no update or delete.
pub struct ArticleVersionRepo;

impl ArticleVersionRepo {
    /// Snapshot the article's current title, description and content as
    /// the next version number. Runs on the caller's transaction, which must
    /// hold a row lock on the article so numbering cannot race.
    pub async fn snapshot<'e, E: PgExecutor<'e>>(
        executor: E,
        article_id: DbId,
        created_by: DbId,
        change_summary: Option<&str>,
    ) -> Result<ArticleVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO article_versions
                (article_id, title, description, content, version_number, change_summary, created_by)
             SELECT a.id, a.title, a.description, a.content,
                    COALESCE((SELECT MAX(v.version_number) FROM article_versions v
                              WHERE v.article_id = a.id), 0) + 1,
                    $2, $3
             FROM articles a
             WHERE a.id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ArticleVersion>(&query)
            .bind(article_id)
            .bind(change_summary)
            .bind(created_by)
            .fetch_one(executor)
            .await
    }

    /// All versions of an article, newest first.
    pub async fn list_by_article(
        pool: &PgPool,
        article_id: DbId,
    ) -> Result<Vec<ArticleVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM article_versions
             WHERE article_id = $1
             ORDER BY version_number DESC"
        );
        sqlx::query_as::<_, ArticleVersion>(&query)
            .bind(article_id)
            .fetch_all(pool)
            .await
    }
}
