//! Handlers for the caller's own identity.

use axum::Json;
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::types::DbId;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;

/// Body of `GET /api/v1/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: DbId,
    pub email_verified: bool,
    /// `None` when the user is on neither roster.
    pub role: Option<&'static str>,
    pub identity: ResolvedIdentity,
}

/// GET /api/v1/me
///
/// The caller's identity as resolved for this request.
pub async fn me(auth: AuthUser) -> AppResult<Json<DataResponse<MeResponse>>> {
    Ok(Json(DataResponse {
        data: MeResponse {
            user_id: auth.user_id,
            email_verified: auth.email_verified,
            role: auth.identity.role_name(),
            identity: auth.identity,
        },
    }))
}
