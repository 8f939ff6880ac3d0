//! Bearer-token validation.
//!
//! Tokens are issued by the external identity provider; this crate only
//! verifies them. The role is never read from the token.

pub mod jwt;
