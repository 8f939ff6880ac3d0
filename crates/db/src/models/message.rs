//! Chat message model.

use helpdesk_core::message::SenderType;
use helpdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `messages` table. Messages are immutable once written.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: DbId,
    pub ticket_id: DbId,
    pub message: String,
    pub created_by: DbId,
    #[sqlx(try_from = "String")]
    pub sender_type: SenderType,
    pub is_system_message: bool,
    pub created_at: Timestamp,
}

/// Request body for posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessage {
    pub message: String,
    /// Staff only.
    #[serde(default)]
    pub is_system_message: bool,
}

/// Insert payload. `sender_type` is always resolved server-side.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub ticket_id: DbId,
    pub message: String,
    pub created_by: DbId,
    pub sender_type: SenderType,
    pub is_system_message: bool,
}
