//! `AppError` to HTTP response mapping, called directly on the error values.

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use helpdesk_api::error::AppError;
use helpdesk_core::error::CoreError;
use helpdesk_db::StoreError;
use helpdesk_desk::DeskError;
use http_body_util::BodyExt;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_not_found_returns_404() {
    let (status, json) = error_to_response(AppError::Core(CoreError::NotFound {
        entity: "ticket",
        id: 42,
    }))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "ticket with id 42 not found");
}

#[tokio::test]
async fn test_invalid_transition_returns_409() {
    let (status, json) = error_to_response(AppError::Core(CoreError::InvalidTransition {
        entity: "article",
        from: "draft",
        action: "approve",
    }))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");
    assert_eq!(json["error"], "Cannot approve article in status 'draft'");
}

#[tokio::test]
async fn test_store_conflict_returns_409() {
    let (status, json) =
        error_to_response(AppError::Store(StoreError::Conflict("slug already taken".into()))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "slug already taken");
}

#[tokio::test]
async fn test_store_backend_error_is_sanitized() {
    let (status, json) = error_to_response(AppError::Store(StoreError::Backend(
        "connection refused to 10.0.0.5:5432".into(),
    )))
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json.to_string().contains("10.0.0.5"));
}

#[tokio::test]
async fn test_validation_returns_400() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Validation("Feedback is required".into()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[test]
fn test_desk_errors_unwrap_into_their_layer() {
    assert_matches!(
        AppError::from(DeskError::forbidden("Manager role required")),
        AppError::Core(CoreError::Forbidden(_))
    );
    assert_matches!(
        AppError::from(DeskError::Store(StoreError::NotFound("article 3".into()))),
        AppError::Store(StoreError::NotFound(_))
    );
}
