//! Repository for the `tickets` table.

use helpdesk_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::ticket::{NewTicket, Ticket, TicketScope, UpdateTicket};

/// Column list for tickets queries.
const COLUMNS: &str = "id, status, priority, category, created_by, assigned_to, \
    name, resolved, created_at, updated_at";

/// Provides CRUD operations for tickets.
pub struct TicketRepo;

impl TicketRepo {
    /// Insert a new ticket in status `fresh`.
    pub async fn create(pool: &PgPool, input: &NewTicket) -> Result<Ticket, sqlx::Error> {
        let query = format!(
            "INSERT INTO tickets (category, priority, name, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(input.category.as_str())
            .bind(input.priority.as_str())
            .bind(&input.name)
            .bind(input.created_by)
            .fetch_one(pool)
            .await
    }

    /// Find a ticket by ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List tickets for a scope. The unassigned queue is oldest first,
    /// every other scope most recently updated first.
    pub async fn list(pool: &PgPool, scope: TicketScope) -> Result<Vec<Ticket>, sqlx::Error> {
        let (filter, order, bind) = match scope {
            TicketScope::All => ("TRUE", "updated_at DESC, id DESC", None),
            TicketScope::CreatedBy(user) => ("created_by = $1", "updated_at DESC, id DESC", Some(user)),
            TicketScope::AssignedTo(user) => {
                ("assigned_to = $1", "updated_at DESC, id DESC", Some(user))
            }
            TicketScope::Unassigned => ("assigned_to IS NULL", "created_at ASC, id ASC", None),
        };
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE {filter} ORDER BY {order}");
        let mut q = sqlx::query_as::<_, Ticket>(&query);
        if let Some(user) = bind {
            q = q.bind(user);
        }
        q.fetch_all(pool).await
    }

    /// Patch a ticket. Only non-`None` fields are written; `updated_at` is
    /// left alone. Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTicket,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets SET
                status = COALESCE($2, status),
                priority = COALESCE($3, priority),
                category = COALESCE($4, category),
                name = COALESCE($5, name)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.priority.map(|p| p.as_str()))
            .bind(input.category.map(|c| c.as_str()))
            .bind(&input.name)
            .fetch_optional(pool)
            .await
    }

    /// Advance `updated_at`. The new value is strictly greater than the old
    /// one even when the clock has not moved.
    pub async fn touch<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets
             SET updated_at = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Set the assignee and move the ticket to `in_progress` unless it is
    /// closed.
    pub async fn set_assignee<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        assignee_id: DbId,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            "UPDATE tickets SET
                assigned_to = $2,
                status = CASE WHEN status = 'closed' THEN status ELSE 'in_progress' END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Ticket>(&query)
            .bind(id)
            .bind(assignee_id)
            .fetch_optional(executor)
            .await
    }

    /// Delete a ticket by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
