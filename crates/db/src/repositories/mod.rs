//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods.
//! Methods that take part in multi-statement units accept any
//! [`sqlx::PgExecutor`] so they can run on a transaction; the rest take
//! `&PgPool`.

pub mod approval_request_repo;
pub mod article_note_repo;
pub mod article_repo;
pub mod article_version_repo;
pub mod message_repo;
pub mod roster_repo;
pub mod ticket_repo;

pub use approval_request_repo::ApprovalRequestRepo;
pub use article_note_repo::ArticleNoteRepo;
pub use article_repo::ArticleRepo;
pub use article_version_repo::ArticleVersionRepo;
pub use message_repo::MessageRepo;
pub use roster_repo::{CustomerRepo, EmployeeRepo};
pub use ticket_repo::TicketRepo;
