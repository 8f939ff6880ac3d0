//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for inserts and patches (patch fields are `Option`)
//!
//! Entity structs also derive `Deserialize` so that change events carrying
//! them as JSON can be merged back into typed rows.

pub mod approval_request;
pub mod article;
pub mod article_note;
pub mod article_version;
pub mod customer;
pub mod employee;
pub mod message;
pub mod ticket;
