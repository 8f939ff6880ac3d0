//! In-process change bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ChangeBus`] fans every [`ChangeEvent`] out to all subscribers; each
//! [`Subscription`] filters down to its [`Topic`]. Share it via
//! `Arc<ChangeBus>`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use helpdesk_core::types::DbId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::subscription::Subscription;

helpdesk_core::define_text_enum! {
    /// Tables that publish change notifications.
    Table ("table") {
        Tickets = "tickets",
        Messages = "messages",
        Articles = "articles",
        ApprovalRequests = "approval_requests",
    }
}

helpdesk_core::define_text_enum! {
    /// Kind of row change, spelled as PostgreSQL's `TG_OP`.
    ChangeKind ("change kind") {
        Insert = "INSERT",
        Update = "UPDATE",
        Delete = "DELETE",
    }
}

impl Table {
    /// Column that scopes a row to its parent, if the table has one.
    pub fn scope_column(self) -> Option<&'static str> {
        match self {
            Table::Messages => Some("ticket_id"),
            Table::ApprovalRequests => Some("article_id"),
            Table::Tickets | Table::Articles => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeEvent
// ---------------------------------------------------------------------------

/// One row-level change.
///
/// `new` carries the full row after inserts and updates; `old` carries at
/// least the primary key (and scope column) after deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub record_id: DbId,
    /// Parent id for scoped tables, e.g. the ticket of a message.
    pub scope_id: Option<DbId>,
    pub new: Option<serde_json::Value>,
    pub old: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, record_id: DbId) -> Self {
        Self {
            table,
            kind,
            record_id,
            scope_id: None,
            new: None,
            old: None,
            timestamp: Utc::now(),
        }
    }

    /// Insert or update event carrying the serialized row.
    pub fn upsert<T: Serialize>(
        table: Table,
        kind: ChangeKind,
        record_id: DbId,
        row: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(table, kind, record_id).with_new(serde_json::to_value(row)?))
    }

    /// Delete event; `old` holds the primary key and, for scoped tables,
    /// the scope column.
    pub fn deleted(table: Table, record_id: DbId, scope_id: Option<DbId>) -> Self {
        let mut old = serde_json::Map::new();
        old.insert("id".into(), record_id.into());
        if let (Some(column), Some(scope)) = (table.scope_column(), scope_id) {
            old.insert(column.into(), scope.into());
        }
        Self::new(table, ChangeKind::Delete, record_id)
            .with_scope(scope_id)
            .with_old(serde_json::Value::Object(old))
    }

    pub fn with_scope(mut self, scope_id: Option<DbId>) -> Self {
        self.scope_id = scope_id;
        self
    }

    pub fn with_new(mut self, new: serde_json::Value) -> Self {
        self.new = Some(new);
        self
    }

    pub fn with_old(mut self, old: serde_json::Value) -> Self {
        self.old = Some(old);
        self
    }

    /// Decode `new` into a typed row.
    pub fn decode_new<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.new.clone().map(serde_json::from_value)
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// What a subscription listens to: a table, optionally narrowed to one
/// scope (e.g. the messages of one ticket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub table: Table,
    pub scope: Option<DbId>,
}

impl Topic {
    pub fn table(table: Table) -> Self {
        Self { table, scope: None }
    }

    pub fn scoped(table: Table, scope: DbId) -> Self {
        Self {
            table,
            scope: Some(scope),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table && self.scope.map_or(true, |s| event.scope_id == Some(s))
    }
}

// ---------------------------------------------------------------------------
// ChangeBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`ChangeEvent`]s.
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
    active: Arc<AtomicUsize>,
}

impl ChangeBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow subscribers observe [`RecvError::Lagged`](crate::RecvError).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody is listening.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to one topic. The subscription is released when dropped.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        Subscription::new(topic, self.sender.subscribe(), Arc::clone(&self.active))
    }

    /// Raw receiver for every event on the bus (used by WebSocket fan-out).
    pub fn subscribe_all(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of live topic subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
