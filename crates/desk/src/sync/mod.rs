//! Client-side synchronization of store rows.
//!
//! A view keeps a [`SyncedCollection`] in step with the store: its own writes
//! are applied optimistically and marked pending, change events are merged in
//! field by field, and the collection stays sorted after every change.

pub mod collection;
pub(crate) mod feed;
pub mod merge;
pub mod pending;

pub use collection::{
    by_created_asc, by_load_asc, by_updated_desc, ticket_by_created_asc, Applied, Record, SyncedCollection,
};
pub use pending::PendingWrites;
