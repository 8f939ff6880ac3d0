//! Row-level change notifications for the helpdesk.
//!
//! - [`ChangeEvent`]: the envelope describing one insert, update or delete.
//! - [`ChangeBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`Subscription`]: a topic-filtered receiver that releases itself on drop.
//! - [`PgChangeListener`]: bridges PostgreSQL `NOTIFY` into the bus.

pub mod bus;
pub mod listener;
pub mod subscription;

pub use bus::{ChangeBus, ChangeEvent, ChangeKind, Table, Topic};
pub use listener::PgChangeListener;
pub use subscription::{RecvError, Subscription};
