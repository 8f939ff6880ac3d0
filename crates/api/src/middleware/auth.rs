//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use helpdesk_core::error::CoreError;
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::types::DbId;
use helpdesk_desk::AccessResolver;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller: a valid Bearer token plus the role resolved from
/// the roster for this request.
///
/// The identity may be [`ResolvedIdentity::Unresolved`]; the services refuse
/// such callers on their own checks.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub email_verified: bool,
    pub identity: ResolvedIdentity,
}

impl AuthUser {
    /// Validate `token` and resolve its subject against the roster.
    pub async fn from_token(state: &AppState, token: &str) -> Result<Self, AppError> {
        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;
        let identity = AccessResolver::resolve(state.store.as_ref(), claims.sub).await?;
        Ok(AuthUser {
            user_id: claims.sub,
            email_verified: claims.email_verified,
            identity,
        })
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        AuthUser::from_token(state, token).await
    }
}
