//! Shared harness for the API integration tests: the production router over
//! a seeded in-memory store, plus request helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use helpdesk_api::auth::jwt::{generate_access_token, JwtConfig};
use helpdesk_api::config::{ServerConfig, StoreBackend};
use helpdesk_api::router::build_app_router;
use helpdesk_api::state::AppState;
use helpdesk_api::ws::WsManager;
use helpdesk_core::roles::Permission;
use helpdesk_core::types::DbId;
use helpdesk_desk::MemoryStore;
use helpdesk_events::ChangeBus;
use tower::ServiceExt;

pub const MANAGER: DbId = 1;
pub const TECH_BUSY: DbId = 2;
pub const TECH_FREE: DbId = 3;
pub const BILLING: DbId = 4;
pub const CUSTOMER: DbId = 100;
pub const OTHER_CUSTOMER: DbId = 101;
pub const STRANGER: DbId = 999;

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret-long-enough".to_string(),
        access_token_expiry_mins: 15,
    }
}

/// A `ServerConfig` with safe defaults for tests.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        store_backend: StoreBackend::Memory,
        database_url: None,
        jwt: jwt_config(),
    }
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub bus: Arc<ChangeBus>,
    pub state: AppState,
}

/// The full router, middleware included, over a seeded in-memory store.
pub fn build_test_app() -> TestApp {
    let bus = Arc::new(ChangeBus::default());
    let store = Arc::new(MemoryStore::new().with_bus(Arc::clone(&bus)));
    let staff = [
        (MANAGER, "Morgan Lee", "support", Permission::Manager),
        (TECH_BUSY, "Sam Ortiz", "technical", Permission::Agent),
        (TECH_FREE, "Riley Chen", "Technical", Permission::Agent),
        (BILLING, "Jo Park", "billing", Permission::Agent),
    ];
    for (id, name, department, permission) in staff {
        store
            .add_employee(id, name, department, permission)
            .expect("seeding an employee should succeed");
    }
    store
        .add_customer(CUSTOMER, Some("Casey Doe"))
        .expect("seeding a customer should succeed");
    store
        .add_customer(OTHER_CUSTOMER, None)
        .expect("seeding a customer should succeed");

    let config = test_config();
    let state = AppState {
        store: store.clone(),
        bus: Arc::clone(&bus),
        config: Arc::new(config.clone()),
        ws_manager: Arc::new(WsManager::new()),
    };

    TestApp {
        app: build_app_router(state.clone(), &config),
        store,
        bus,
        state,
    }
}

pub fn token(user_id: DbId) -> String {
    generate_access_token(user_id, true, &jwt_config()).expect("token generation should succeed")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("reading the body should succeed")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    app.clone().oneshot(request).await.expect("request should be served")
}

pub async fn send_as(
    app: &Router,
    method: Method,
    uri: &str,
    user_id: DbId,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(user_id)));
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    };
    app.clone().oneshot(request).await.expect("request should be served")
}

pub async fn get_as(app: &Router, uri: &str, user_id: DbId) -> Response<Body> {
    send_as(app, Method::GET, uri, user_id, None).await
}

pub async fn post_as(
    app: &Router,
    uri: &str,
    user_id: DbId,
    body: serde_json::Value,
) -> Response<Body> {
    send_as(app, Method::POST, uri, user_id, Some(body)).await
}

pub async fn put_as(
    app: &Router,
    uri: &str,
    user_id: DbId,
    body: serde_json::Value,
) -> Response<Body> {
    send_as(app, Method::PUT, uri, user_id, Some(body)).await
}

pub async fn patch_as(
    app: &Router,
    uri: &str,
    user_id: DbId,
    body: serde_json::Value,
) -> Response<Body> {
    send_as(app, Method::PATCH, uri, user_id, Some(body)).await
}

pub async fn delete_as(app: &Router, uri: &str, user_id: DbId) -> Response<Body> {
    send_as(app, Method::DELETE, uri, user_id, None).await
}

/// Open a ticket as `customer` and return its id.
pub async fn open_ticket(app: &Router, customer: DbId, category: &str) -> DbId {
    let response = post_as(
        app,
        "/api/v1/tickets",
        customer,
        serde_json::json!({ "category": category }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"]
        .as_i64()
        .expect("created ticket should carry an id")
}
