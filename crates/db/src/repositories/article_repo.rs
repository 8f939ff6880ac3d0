//! Repository for the `articles` table and its `article_tags`.

use helpdesk_core::article::ArticleStatus;
use helpdesk_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::article::{Article, ArticleFilter, NewArticle, UpdateArticle};

/// Column list for articles queries; tags are folded in as a sorted array.
const COLUMNS: &str = "a.id, a.title, a.description, a.content, a.status, a.category, \
    a.is_faq, a.slug, a.view_count, a.created_by, a.created_at, a.updated_at, a.published_at, \
    ARRAY(SELECT t.tag FROM article_tags t WHERE t.article_id = a.id ORDER BY t.tag) AS tags";

/// Provides CRUD operations for articles.
pub struct ArticleRepo;

impl ArticleRepo {
    /// Insert a draft article and its tags. Runs on the caller's transaction.
    pub async fn create(conn: &mut PgConnection, input: &NewArticle) -> Result<Article, sqlx::Error> {
        let (id,): (DbId,) = sqlx::query_as(
            "INSERT INTO articles (title, description, content, category, is_faq, slug, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.content)
        .bind(input.category.as_str())
        .bind(input.is_faq)
        .bind(&input.slug)
        .bind(input.created_by)
        .fetch_one(&mut *conn)
        .await?;

        Self::replace_tags(&mut *conn, id, &input.tags).await?;
        Self::find_by_id(&mut *conn, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Find an article by ID, tags included.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Article>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM articles a WHERE a.id = $1");
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List articles matching `filter`, most recently updated first.
    pub async fn list(pool: &PgPool, filter: &ArticleFilter) -> Result<Vec<Article>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM articles a
             WHERE (cardinality($1::TEXT[]) = 0 OR a.status = ANY($1))
               AND ($2::TEXT IS NULL OR a.category = $2)
               AND ($3::BOOL IS NULL OR a.is_faq = $3)
               AND ($4::BIGINT IS NULL OR a.created_by = $4)
               AND ($5::TEXT IS NULL
                    OR a.title ILIKE $5
                    OR a.description ILIKE $5
                    OR a.content ILIKE $5)
             ORDER BY a.updated_at DESC, a.id DESC"
        );
        let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));
        sqlx::query_as::<_, Article>(&query)
            .bind(statuses)
            .bind(filter.category.map(|c| c.as_str()))
            .bind(filter.is_faq)
            .bind(filter.created_by)
            .bind(pattern)
            .fetch_all(pool)
            .await
    }

    /// Slugs equal to `base` or starting with `base-`.
    pub async fn slugs_like(pool: &PgPool, base: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT slug FROM articles WHERE slug = $1 OR slug LIKE $2")
                .bind(base)
                .bind(format!("{}-%", escape_like(base)))
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(slug,)| slug).collect())
    }

    /// Apply an edit, set the status and replace the tags when given.
    /// Runs on the caller's transaction. Returns `None` if the row is gone.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateArticle,
        status: ArticleStatus,
    ) -> Result<Option<Article>, sqlx::Error> {
        let updated: Option<(DbId,)> = sqlx::query_as(
            "UPDATE articles SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                content = COALESCE($4, content),
                category = COALESCE($5, category),
                is_faq = COALESCE($6, is_faq),
                status = $7,
                updated_at = NOW()
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.content)
        .bind(input.category.map(|c| c.as_str()))
        .bind(input.is_faq)
        .bind(status.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }
        if let Some(tags) = &input.tags {
            Self::replace_tags(&mut *conn, id, tags).await?;
        }
        Self::find_by_id(&mut *conn, id).await
    }

    /// Move an article from `from` to `to`. Returns `None` when the article
    /// is missing or no longer in `from`.
    pub async fn transition<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        from: ArticleStatus,
        to: ArticleStatus,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "UPDATE articles SET
                status = $3,
                updated_at = NOW(),
                published_at = CASE WHEN $3 = 'approved' THEN NOW() ELSE published_at END
             WHERE id = $1 AND status = $2
             RETURNING id",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(executor)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Bump the view counter through `increment_article_view_count`.
    /// Returns `None` if the article does not exist.
    pub async fn increment_view_count(pool: &PgPool, id: DbId) -> Result<Option<i64>, sqlx::Error> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT increment_article_view_count($1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    async fn replace_tags(conn: &mut PgConnection, id: DbId, tags: &[String]) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if !tags.is_empty() {
            sqlx::query(
                "INSERT INTO article_tags (article_id, tag)
                 SELECT $1, tag FROM UNNEST($2::TEXT[]) AS tag
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tags)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
