//! WebSocket push of row changes.
//!
//! A client connects to `/api/v1/ws?token=<jwt>` and sends JSON commands
//! ([`protocol::ClientCommand`]) to watch the ticket list or one ticket's
//! messages. Matching change events are pushed back as
//! [`protocol::ServerMessage`] frames until the watch changes or the socket
//! closes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod protocol;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
