//! Chat message rules: sender classification, text normalisation and the
//! system notice emitted on assignment.

use crate::error::CoreError;

crate::define_text_enum! {
    /// Which side of the conversation wrote a message. Always derived from
    /// the author's resolved role, never accepted from the client.
    SenderType ("sender type") {
        Employee = "employee",
        Customer = "customer",
    }
}

/// Maximum length of a single chat message.
pub const MAX_MESSAGE_LEN: usize = 10_000;

/// Normalise outgoing message text.
///
/// Returns `Ok(None)` when the text is empty or whitespace-only (sending is a
/// no-op), the trimmed text otherwise.
pub fn prepare_message_text(text: &str) -> Result<Option<String>, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(CoreError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

/// Text of the system message posted when a ticket is assigned.
pub fn assignment_notice(full_name: &str, department: &str) -> String {
    format!("Ticket has been assigned to {full_name} from {department} department.")
}
