//! Ordered, id-keyed collection kept in sync with change events.

use std::cmp::Ordering;

use helpdesk_core::types::DbId;
use helpdesk_db::models::article::Article;
use helpdesk_db::models::employee::EmployeeWithLoad;
use helpdesk_db::models::message::Message;
use helpdesk_db::models::ticket::Ticket;
use helpdesk_events::{ChangeEvent, ChangeKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::merge::merge_fields;
use super::pending::PendingWrites;

/// A row that can live in a [`SyncedCollection`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> DbId;
}

impl Record for Ticket {
    fn id(&self) -> DbId {
        self.id
    }
}

impl Record for Message {
    fn id(&self) -> DbId {
        self.id
    }
}

impl Record for Article {
    fn id(&self) -> DbId {
        self.id
    }
}

impl Record for EmployeeWithLoad {
    fn id(&self) -> DbId {
        self.id
    }
}

/// Most recently updated first.
pub fn by_updated_desc(a: &Ticket, b: &Ticket) -> Ordering {
    b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id))
}

/// Oldest first.
pub fn by_created_asc(a: &Message, b: &Message) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

/// Oldest first, for queues.
pub fn ticket_by_created_asc(a: &Ticket, b: &Ticket) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

/// Least loaded first, as the roster is ranked for routing.
pub fn by_load_asc(a: &EmployeeWithLoad, b: &EmployeeWithLoad) -> Ordering {
    a.unresolved_tickets
        .cmp(&b.unresolved_tickets)
        .then(a.id.cmp(&b.id))
}

/// What applying one change did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    /// Fields merged into an existing row.
    Merged,
    /// The echo of one of our own pending writes.
    Confirmed,
    Removed,
    /// Not for this collection (filtered out or unknown id).
    Ignored,
    /// The stream lagged and the collection was reloaded.
    Reloaded,
}

struct Entry<T> {
    record: T,
    /// Client-only fields; never sent to or overwritten by the store.
    transient: Map<String, Value>,
}

type Admit<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Id-unique, always-sorted set of rows.
pub struct SyncedCollection<T: Record> {
    entries: Vec<Entry<T>>,
    pending: PendingWrites,
    order: fn(&T, &T) -> Ordering,
    admit: Admit<T>,
}

impl<T: Record> SyncedCollection<T> {
    pub fn new(order: fn(&T, &T) -> Ordering) -> Self {
        Self {
            entries: Vec::new(),
            pending: PendingWrites::default(),
            order,
            admit: Box::new(|_| true),
        }
    }

    /// Only rows passing `admit` are kept; a row that stops passing after a
    /// merge is dropped.
    pub fn with_filter(mut self, admit: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.admit = Box::new(admit);
        self
    }

    /// Replace the contents with a fresh load. Transient fields survive for
    /// rows that are still present; pending marks are dropped.
    pub fn replace_all(&mut self, rows: Vec<T>) {
        let mut previous: Vec<Entry<T>> = std::mem::take(&mut self.entries);
        for row in rows.into_iter().filter(|r| (self.admit)(r)) {
            if self.position_in(&self.entries, row.id()).is_some() {
                continue;
            }
            let transient = previous
                .iter()
                .position(|e| e.record.id() == row.id())
                .map(|i| previous.swap_remove(i).transient)
                .unwrap_or_default();
            self.entries.push(Entry {
                record: row,
                transient,
            });
        }
        self.pending.clear();
        self.sort();
    }

    /// Whether `row` belongs in this collection.
    pub fn admits(&self, row: &T) -> bool {
        (self.admit)(row)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn get(&self, id: DbId) -> Option<&T> {
        self.position(id).map(|i| &self.entries[i].record)
    }

    pub fn first(&self) -> Option<&T> {
        self.entries.first().map(|e| &e.record)
    }

    pub fn is_pending(&self, id: DbId) -> bool {
        self.pending.contains(id)
    }

    pub fn transient(&self, id: DbId) -> Option<&Map<String, Value>> {
        self.position(id).map(|i| &self.entries[i].transient)
    }

    /// Set a client-only field. Returns `false` if the row is not present.
    pub fn set_transient(&mut self, id: DbId, key: impl Into<String>, value: Value) -> bool {
        match self.position(id) {
            Some(i) => {
                self.entries[i].transient.insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    // -- local writes ------------------------------------------------------

    /// Apply a local write ahead of the store's echo. Returns the previous
    /// row so a failed write can be reverted.
    pub fn apply_local(&mut self, row: T) -> Option<T> {
        let id = row.id();
        self.pending.mark(id);
        let previous = self.upsert(row);
        self.sort();
        previous
    }

    /// Remove a row ahead of the store's delete event.
    pub fn remove_local(&mut self, id: DbId) -> Option<T> {
        self.pending.settle(id);
        self.position(id).map(|i| self.entries.remove(i).record)
    }

    /// Record the row the store returned for our write. The pending mark is
    /// kept until the change event arrives.
    pub fn confirm(&mut self, row: T) {
        if !(self.admit)(&row) {
            if let Some(i) = self.position(row.id()) {
                self.entries.remove(i);
            }
            return;
        }
        self.upsert(row);
        self.sort();
    }

    /// Undo a failed local write: restore `previous`, or drop the row when
    /// there was none.
    pub fn revert(&mut self, id: DbId, previous: Option<T>) {
        self.pending.settle(id);
        match previous {
            Some(row) => {
                self.upsert(row);
            }
            None => {
                if let Some(i) = self.position(id) {
                    self.entries.remove(i);
                }
            }
        }
        self.sort();
    }

    // -- change events -----------------------------------------------------

    /// Apply one change event from the store.
    ///
    /// Inserts are deduplicated by id, updates are merged field by field
    /// (the event's values win, transient fields are kept) and deletes
    /// remove by id.
    pub fn apply_event(&mut self, event: &ChangeEvent) -> Applied {
        let id = event.record_id;
        match event.kind {
            ChangeKind::Delete => {
                self.pending.settle(id);
                match self.position(id) {
                    Some(i) => {
                        self.entries.remove(i);
                        Applied::Removed
                    }
                    None => Applied::Ignored,
                }
            }
            ChangeKind::Insert | ChangeKind::Update => {
                let Some(changes) = event.new.as_ref() else {
                    return Applied::Ignored;
                };
                let was_pending = self.pending.settle(id);
                let outcome = match self.position(id) {
                    Some(i) => match merge_fields(&self.entries[i].record, changes) {
                        Ok(merged) if (self.admit)(&merged) => {
                            self.entries[i].record = merged;
                            if was_pending {
                                Applied::Confirmed
                            } else {
                                Applied::Merged
                            }
                        }
                        Ok(_) => {
                            self.entries.remove(i);
                            Applied::Removed
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, id, table = %event.table, "Unmergeable change");
                            Applied::Ignored
                        }
                    },
                    None => match serde_json::from_value::<T>(changes.clone()) {
                        Ok(row) if (self.admit)(&row) => {
                            self.entries.push(Entry {
                                record: row,
                                transient: Map::new(),
                            });
                            Applied::Inserted
                        }
                        Ok(_) => Applied::Ignored,
                        Err(e) => {
                            tracing::warn!(error = %e, id, table = %event.table, "Undecodable change");
                            Applied::Ignored
                        }
                    },
                };
                self.sort();
                outcome
            }
        }
    }

    // -- internals ---------------------------------------------------------

    fn upsert(&mut self, row: T) -> Option<T> {
        match self.position(row.id()) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].record, row)),
            None => {
                self.entries.push(Entry {
                    record: row,
                    transient: Map::new(),
                });
                None
            }
        }
    }

    fn position(&self, id: DbId) -> Option<usize> {
        self.position_in(&self.entries, id)
    }

    fn position_in(&self, entries: &[Entry<T>], id: DbId) -> Option<usize> {
        entries.iter().position(|e| e.record.id() == id)
    }

    fn sort(&mut self) {
        let order = self.order;
        self.entries.sort_by(|a, b| order(&a.record, &b.record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use helpdesk_core::message::SenderType;
    use helpdesk_core::ticket::{TicketCategory, TicketPriority, TicketStatus};
    use helpdesk_events::Table;
    use serde_json::json;

    fn message(id: DbId, offset_secs: i64) -> Message {
        Message {
            id,
            ticket_id: 1,
            message: format!("m{id}"),
            created_by: 10,
            sender_type: SenderType::Customer,
            is_system_message: false,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
                + Duration::seconds(offset_secs),
        }
    }

    fn ticket(id: DbId, updated_offset: i64) -> Ticket {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Ticket {
            id,
            status: TicketStatus::Fresh,
            priority: TicketPriority::Medium,
            category: TicketCategory::General,
            created_by: 10,
            assigned_to: None,
            name: String::new(),
            resolved: false,
            created_at: base,
            updated_at: base + Duration::seconds(updated_offset),
        }
    }

    fn insert_event(row: &Message) -> ChangeEvent {
        ChangeEvent::upsert(Table::Messages, ChangeKind::Insert, row.id, row)
            .unwrap()
            .with_scope(Some(row.ticket_id))
    }

    #[test]
    fn test_out_of_order_inserts_stay_sorted() {
        let mut messages = SyncedCollection::new(by_created_asc);
        for (id, offset) in [(3, 30), (1, 10), (2, 20)] {
            messages.apply_event(&insert_event(&message(id, offset)));
        }
        let ids: Vec<DbId> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_local_write_and_echo_leave_one_entry() {
        let mut messages = SyncedCollection::new(by_created_asc);
        let sent = message(7, 0);
        messages.apply_local(sent.clone());
        assert!(messages.is_pending(7));

        assert_eq!(messages.apply_event(&insert_event(&sent)), Applied::Confirmed);
        assert_eq!(messages.len(), 1);
        assert!(!messages.is_pending(7));

        assert_eq!(messages.apply_event(&insert_event(&sent)), Applied::Merged);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_update_merges_and_keeps_transient_fields() {
        let mut tickets = SyncedCollection::new(by_updated_desc);
        tickets.replace_all(vec![ticket(1, 0)]);
        tickets.set_transient(1, "draft_reply", json!("Hi there"));

        let event = ChangeEvent::new(Table::Tickets, ChangeKind::Update, 1)
            .with_new(json!({"id": 1, "status": "closed", "resolved": true}));
        assert_eq!(tickets.apply_event(&event), Applied::Merged);

        let row = tickets.get(1).unwrap();
        assert_eq!(row.status, TicketStatus::Closed);
        assert!(row.resolved);
        assert_eq!(tickets.transient(1).unwrap()["draft_reply"], "Hi there");
    }

    #[test]
    fn test_touch_reorders_tickets() {
        let mut tickets = SyncedCollection::new(by_updated_desc);
        tickets.replace_all(vec![ticket(1, 10), ticket(2, 20)]);
        assert_eq!(tickets.first().unwrap().id, 2);

        let touched = ticket(1, 30);
        let event = ChangeEvent::upsert(Table::Tickets, ChangeKind::Update, 1, &touched).unwrap();
        tickets.apply_event(&event);
        assert_eq!(tickets.first().unwrap().id, 1);
    }

    #[test]
    fn test_delete_removes_by_id() {
        let mut tickets = SyncedCollection::new(by_updated_desc);
        tickets.replace_all(vec![ticket(1, 0), ticket(2, 0)]);
        let event = ChangeEvent::deleted(Table::Tickets, 1, None);
        assert_eq!(tickets.apply_event(&event), Applied::Removed);
        assert_eq!(tickets.apply_event(&event), Applied::Ignored);
        assert_eq!(tickets.len(), 1);
    }

    #[test]
    fn test_filtered_collection_drops_rows_that_leave_scope() {
        let mut queue =
            SyncedCollection::new(ticket_by_created_asc).with_filter(|t: &Ticket| t.assigned_to.is_none());
        queue.replace_all(vec![ticket(1, 0)]);

        let event = ChangeEvent::new(Table::Tickets, ChangeKind::Update, 1)
            .with_new(json!({"assigned_to": 42, "status": "in_progress"}));
        assert_eq!(queue.apply_event(&event), Applied::Removed);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_revert_restores_previous_row() {
        let mut tickets = SyncedCollection::new(by_updated_desc);
        tickets.replace_all(vec![ticket(1, 0)]);

        let mut edited = ticket(1, 0);
        edited.status = TicketStatus::Closed;
        let previous = tickets.apply_local(edited);
        tickets.revert(1, previous);

        assert_eq!(tickets.get(1).unwrap().status, TicketStatus::Fresh);
        assert!(!tickets.is_pending(1));
    }

    #[test]
    fn test_revert_of_new_row_removes_it() {
        let mut messages = SyncedCollection::new(by_created_asc);
        let previous = messages.apply_local(message(4, 0));
        messages.revert(4, previous);
        assert!(messages.is_empty());
    }
}
