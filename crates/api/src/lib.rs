//! HTTP and WebSocket surface of the helpdesk.
//!
//! Handlers are thin: they authenticate the bearer token, re-resolve the
//! caller's role and hand off to the services in `helpdesk_desk`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
