use helpdesk_core::error::CoreError;
use helpdesk_db::StoreError;

/// Errors surfaced by adapters, workflows and views.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type DeskResult<T> = Result<T, DeskError>;

impl DeskError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        DeskError::Core(CoreError::Forbidden(msg.into()))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        DeskError::Core(CoreError::Unauthorized(msg.into()))
    }

    pub fn not_found(entity: &'static str, id: helpdesk_core::types::DbId) -> Self {
        DeskError::Core(CoreError::NotFound { entity, id })
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DeskError::Core(CoreError::Validation(msg.into()))
    }
}

/// Log a failed store call and wrap it.
pub(crate) fn store_failure(operation: &'static str) -> impl FnOnce(StoreError) -> DeskError {
    move |err| {
        match &err {
            StoreError::NotFound(_) | StoreError::Conflict(_) => {
                tracing::warn!(error = %err, operation, "Store call refused")
            }
            StoreError::Backend(_) => tracing::error!(error = %err, operation, "Store call failed"),
        }
        DeskError::Store(err)
    }
}
