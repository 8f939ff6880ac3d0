//! Helpdesk application layer.
//!
//! Adapters ([`TicketService`], [`MessageService`], [`AssignmentService`],
//! [`ArticleReview`]) run one operation against the store after re-checking
//! the caller. Views ([`TicketDesk`], [`MessageThread`], [`SupportChat`],
//! [`RosterView`]) sit on top, keep a synchronized local copy fed by the
//! change bus and apply their own writes optimistically.

pub mod access;
pub mod assignment;
pub mod chat;
pub mod error;
pub mod memory;
pub mod messages;
pub mod review;
pub mod roster;
pub mod session;
pub mod sync;
pub mod tickets;

pub use access::{AccessResolver, Requirement};
pub use assignment::AssignmentService;
pub use chat::{ChatStage, SupportChat};
pub use error::{DeskError, DeskResult};
pub use memory::{FailPoint, MemoryStore};
pub use messages::{MessageService, MessageThread};
pub use review::ArticleReview;
pub use roster::RosterView;
pub use session::{IdentityProvider, Session, SessionCell, SessionContext};
pub use sync::{Applied, SyncedCollection};
pub use tickets::{TicketDesk, TicketService};
