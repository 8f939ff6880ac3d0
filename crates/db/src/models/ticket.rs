//! Support ticket model and DTOs.

use helpdesk_core::ticket::{TicketCategory, TicketPriority, TicketStatus};
use helpdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `tickets` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    #[sqlx(try_from = "String")]
    pub priority: TicketPriority,
    #[sqlx(try_from = "String")]
    pub category: TicketCategory,
    pub created_by: DbId,
    pub assigned_to: Option<DbId>,
    pub name: String,
    /// Generated column: `status = 'closed'`.
    pub resolved: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for opening a ticket. The creator comes from the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicket {
    pub category: TicketCategory,
    pub priority: Option<TicketPriority>,
    pub name: Option<String>,
}

/// Insert payload assembled by the ticket adapter.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub name: String,
    pub created_by: DbId,
}

/// Field patch for a ticket. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTicket {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub name: Option<String>,
}

/// Manager "save changes" form: only fields that differ from the current
/// row are written, an assignee change goes through atomic assignment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketChanges {
    pub name: Option<String>,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub assigned_to: Option<DbId>,
}

/// Atomic assignment unit: set the assignee, advance the status and post
/// the system notice, all or nothing.
#[derive(Debug, Clone)]
pub struct AssignTicket {
    pub ticket_id: DbId,
    pub assignee_id: DbId,
    /// The manager confirming the assignment; author of the notice.
    pub assigned_by: DbId,
    pub notice: String,
}

/// Which tickets a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TicketScope {
    /// Everything, most recently updated first.
    #[default]
    All,
    /// Tickets opened by one user, most recently updated first.
    CreatedBy(DbId),
    /// Tickets assigned to one employee, most recently updated first.
    AssignedTo(DbId),
    /// Manager queue: no assignee, oldest first.
    Unassigned,
}
