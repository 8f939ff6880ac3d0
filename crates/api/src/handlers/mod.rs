pub mod articles;
pub mod assignment;
pub mod identity;
pub mod messages;
pub mod tickets;
