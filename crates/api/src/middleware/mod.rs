//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Validates the Bearer token and resolves the caller.
//! - [`rbac::RequireStaff`] -- Requires an employee.
//! - [`rbac::RequireManager`] -- Requires manager, admin or super admin.

pub mod auth;
pub mod rbac;
