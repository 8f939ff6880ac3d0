use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use helpdesk_core::types::{DbId, Timestamp};
use helpdesk_events::Topic;
use tokio::sync::{mpsc, RwLock};
use tokio::task::AbortHandle;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// The change feed a connection is currently watching.
struct Watch {
    topic: Topic,
    /// Forwarding task; aborting it drops the bus subscription.
    task: AbortHandle,
}

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// The authenticated user. Connections are only accepted with a valid token.
    pub user_id: DbId,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    pub connected_at: Timestamp,
    watch: Option<Watch>,
}

impl WsConnection {
    fn stop_watching(&mut self) -> bool {
        match self.watch.take() {
            Some(watch) => {
                watch.task.abort();
                true
            }
            None => false,
        }
    }
}

/// Manages all active WebSocket connections and their watch scopes.
///
/// Each connection watches at most one topic at a time; starting a new watch
/// stops the previous one. Thread-safe via interior `RwLock`; wrap in `Arc`.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String, user_id: DbId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
            watch: None,
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID, stopping its watch.
    pub async fn remove(&self, conn_id: &str) {
        if let Some(mut conn) = self.connections.write().await.remove(conn_id) {
            conn.stop_watching();
        }
    }

    /// A clone of the connection's outbound sender.
    pub async fn sender(&self, conn_id: &str) -> Option<WsSender> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .map(|conn| conn.sender.clone())
    }

    /// Queue a message for one connection. Returns `false` if it is gone.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        match self.connections.read().await.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Install the forwarding task for `topic`, stopping any previous watch.
    ///
    /// If the connection has already gone away the task is aborted and
    /// `false` returned.
    pub async fn set_watch(&self, conn_id: &str, topic: Topic, task: AbortHandle) -> bool {
        let mut conns = self.connections.write().await;
        let Some(conn) = conns.get_mut(conn_id) else {
            task.abort();
            return false;
        };
        conn.stop_watching();
        conn.watch = Some(Watch { topic, task });
        true
    }

    /// Stop the connection's watch. Returns `true` if one was running.
    pub async fn clear_watch(&self, conn_id: &str) -> bool {
        self.connections
            .write()
            .await
            .get_mut(conn_id)
            .is_some_and(WsConnection::stop_watching)
    }

    pub async fn watched_topic(&self, conn_id: &str) -> Option<Topic> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .and_then(|conn| conn.watch.as_ref().map(|w| w.topic))
    }

    /// Find all connection IDs associated with a given user.
    pub async fn get_by_user(&self, user_id: DbId) -> Vec<String> {
        self.connections
            .read()
            .await
            .iter()
            .filter(|(_, conn)| conn.user_id == user_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of connections with a running watch.
    pub async fn watch_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|conn| conn.watch.is_some())
            .count()
    }

    /// Stop every watch, send a Close frame to every connection, then clear
    /// the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values_mut() {
            conn.stop_watching();
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
