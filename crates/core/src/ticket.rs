//! Ticket lifecycle rules: status, priority, category, naming, and the
//! monotonic `updated_at` clock.
//!
//! Lives in `core` so both the store implementations and the optimistic
//! client-side views apply exactly the same rules.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

crate::define_text_enum! {
    /// Ticket lifecycle status.
    TicketStatus ("ticket status") {
        Fresh = "fresh",
        InProgress = "in_progress",
        Closed = "closed",
    }
}

crate::define_text_enum! {
    /// Ticket urgency.
    TicketPriority ("ticket priority") {
        Low = "low",
        Medium = "medium",
        High = "high",
        Critical = "critical",
    }
}

crate::define_text_enum! {
    /// What the customer needs help with. Doubles as the routing key that is
    /// matched against employee departments.
    TicketCategory ("ticket category") {
        General = "general",
        Billing = "billing",
        Technical = "technical",
        Feedback = "feedback",
        Account = "account",
        FeatureRequest = "feature_request",
        Other = "other",
    }
}

impl TicketStatus {
    /// A ticket counts as resolved exactly when it is closed.
    pub fn is_resolved(self) -> bool {
        self == TicketStatus::Closed
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        TicketPriority::Medium
    }
}

impl TicketCategory {
    /// Case-insensitive comparison against an employee department name.
    pub fn matches_department(self, department: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(department.trim())
    }
}

/// Maximum length of a ticket's display name.
pub const MAX_TICKET_NAME_LEN: usize = 200;

/// Validate a ticket display name. Empty names are allowed (the UI falls back
/// to the ticket number).
pub fn validate_ticket_name(name: &str) -> Result<(), CoreError> {
    if name.chars().count() > MAX_TICKET_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Ticket name must be at most {MAX_TICKET_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Status a ticket moves to when an employee is assigned.
///
/// Closed tickets stay closed; everything else becomes `in_progress`.
pub fn status_after_assignment(current: TicketStatus) -> TicketStatus {
    match current {
        TicketStatus::Closed => TicketStatus::Closed,
        TicketStatus::Fresh | TicketStatus::InProgress => TicketStatus::InProgress,
    }
}

/// Next `updated_at` value for a ticket.
///
/// `updated_at` is the "most recent" sort key and must strictly increase per
/// write even when two writes land within the clock's resolution.
pub fn next_touch(previous: Timestamp, now: Timestamp) -> Timestamp {
    let floor = previous + Duration::microseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}
