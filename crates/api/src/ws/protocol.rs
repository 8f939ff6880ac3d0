//! JSON frames exchanged over the WebSocket.

use axum::extract::ws::Message;
use helpdesk_core::types::DbId;
use helpdesk_events::{ChangeEvent, Topic};
use serde::{Deserialize, Serialize};

/// Commands sent by the client.
///
/// ```json
/// { "action": "watch_tickets" }
/// { "action": "watch_messages", "ticket_id": 42 }
/// { "action": "unwatch" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientCommand {
    WatchTickets,
    WatchMessages { ticket_id: DbId },
    Unwatch,
}

/// Frames pushed by the server, tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Watching { topic: Topic },
    Unwatched,
    Change { event: ChangeEvent },
    /// Events were dropped for this watcher; reload the watched list.
    Lagged { missed: u64 },
    Error { code: &'static str, message: String },
}

impl ServerMessage {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::Text(serde_json::to_string(self)?.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_events::{ChangeKind, Table};

    #[test]
    fn test_commands_parse_from_tagged_json() {
        let watch: ClientCommand =
            serde_json::from_str(r#"{"action":"watch_messages","ticket_id":7}"#).unwrap();
        assert_eq!(watch, ClientCommand::WatchMessages { ticket_id: 7 });
        let unwatch: ClientCommand = serde_json::from_str(r#"{"action":"unwatch"}"#).unwrap();
        assert_eq!(unwatch, ClientCommand::Unwatch);
        assert!(serde_json::from_str::<ClientCommand>(r#"{"action":"shout"}"#).is_err());
    }

    #[test]
    fn test_change_frame_nests_the_event() {
        let frame = ServerMessage::Change {
            event: ChangeEvent::new(Table::Messages, ChangeKind::Insert, 3).with_scope(Some(7)),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "change");
        assert_eq!(json["event"]["table"], "messages");
        assert_eq!(json["event"]["kind"], "INSERT");
        assert_eq!(json["event"]["scope_id"], 7);
    }
}
