//! Domain rules for the helpdesk: tickets, messages, routing, the article
//! review workflow and role resolution.
//!
//! This crate has no internal dependencies so it can be shared by the
//! database layer, the client-side views and the HTTP API alike.

pub mod enums;

pub mod article;
pub mod error;
pub mod message;
pub mod metrics;
pub mod roles;
pub mod routing;
pub mod ticket;
pub mod types;
