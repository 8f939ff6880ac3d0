//! Role-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects callers whose freshly
//! resolved role does not meet the requirement. The services check again;
//! these only let routes state their intent and fail before the body is read.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use helpdesk_desk::{AccessResolver, Requirement};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires an employee. Rejects customers with 403 and unknown users with 401.
pub struct RequireStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        AccessResolver::check(&user.identity, Requirement::Staff)?;
        Ok(RequireStaff(user))
    }
}

/// Requires manager, admin or super admin.
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        AccessResolver::check(&user.identity, Requirement::Manager)?;
        Ok(RequireManager(user))
    }
}
