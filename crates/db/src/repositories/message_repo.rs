//! Repository for the `messages` table.

use helpdesk_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::message::{Message, NewMessage};

const COLUMNS: &str = "id, ticket_id, message, created_by, sender_type, is_system_message, created_at";

pub struct MessageRepo;

impl MessageRepo {
    /// Append a message to a ticket's log.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewMessage,
    ) -> Result<Message, sqlx::Error> {
        let query = format!(
            "INSERT INTO messages (ticket_id, message, created_by, sender_type, is_system_message)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(input.ticket_id)
            .bind(&input.message)
            .bind(input.created_by)
            .bind(input.sender_type.as_str())
            .bind(input.is_system_message)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Message>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM messages WHERE id = $1");
        sqlx::query_as::<_, Message>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All messages of a ticket, oldest first.
    pub async fn list_by_ticket(pool: &PgPool, ticket_id: DbId) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages
             WHERE ticket_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(ticket_id)
            .fetch_all(pool)
            .await
    }

    /// Delete every message of a ticket. Returns the number of rows removed.
    pub async fn delete_by_ticket(pool: &PgPool, ticket_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM messages WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
