//! Ticket, message and assignment endpoints.

mod common;

use axum::http::StatusCode;
use common::*;
use helpdesk_db::{MessageStore, TicketStore};
use helpdesk_desk::FailPoint;
use serde_json::json;

#[tokio::test]
async fn test_customer_opens_a_fresh_ticket() {
    let t = build_test_app();
    let response = post_as(&t.app, "/api/v1/tickets", CUSTOMER, json!({ "category": "billing" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let ticket = &body_json(response).await["data"];
    assert_eq!(ticket["status"], "fresh");
    assert_eq!(ticket["priority"], "medium");
    assert_eq!(ticket["category"], "billing");
    assert_eq!(ticket["created_by"], CUSTOMER);
    assert!(ticket["assigned_to"].is_null());
}

#[tokio::test]
async fn test_customers_only_list_their_own_tickets() {
    let t = build_test_app();
    let mine = open_ticket(&t.app, CUSTOMER, "technical").await;
    open_ticket(&t.app, OTHER_CUSTOMER, "technical").await;

    let json = body_json(get_as(&t.app, "/api/v1/tickets", CUSTOMER).await).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![mine]);

    let staff = body_json(get_as(&t.app, "/api/v1/tickets", TECH_FREE).await).await;
    assert_eq!(staff["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_customer_cannot_read_someone_elses_ticket() {
    let t = build_test_app();
    let theirs = open_ticket(&t.app, OTHER_CUSTOMER, "general").await;
    let response = get_as(&t.app, &format!("/api/v1/tickets/{theirs}"), CUSTOMER).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_status_updates_are_staff_only() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let uri = format!("/api/v1/tickets/{id}/status");

    let refused = put_as(&t.app, &uri, CUSTOMER, json!({ "status": "closed" })).await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let closed = put_as(&t.app, &uri, TECH_FREE, json!({ "status": "closed" })).await;
    assert_eq!(closed.status(), StatusCode::OK);
    let ticket = &body_json(closed).await["data"];
    assert_eq!(ticket["status"], "closed");
    assert_eq!(ticket["resolved"], true);
}

#[tokio::test]
async fn test_invalid_enum_value_is_rejected() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let response = put_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/priority"),
        TECH_FREE,
        json!({ "priority": "urgent" }),
    )
    .await;
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_unassigned_queue_is_for_managers() {
    let t = build_test_app();
    let first = open_ticket(&t.app, CUSTOMER, "technical").await;
    let second = open_ticket(&t.app, OTHER_CUSTOMER, "billing").await;

    let refused = get_as(&t.app, "/api/v1/tickets/unassigned", TECH_FREE).await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    let json = body_json(get_as(&t.app, "/api/v1/tickets/unassigned", MANAGER).await).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn test_recommend_then_assign() {
    let t = build_test_app();
    let busy = open_ticket(&t.app, CUSTOMER, "technical").await;
    post_as(&t.app, &format!("/api/v1/tickets/{busy}/assign"), MANAGER, json!({ "assignee_id": TECH_BUSY })).await;

    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let json = body_json(get_as(&t.app, &format!("/api/v1/tickets/{id}/recommendation"), MANAGER).await).await;
    assert_eq!(json["data"]["id"], TECH_FREE);

    let response = post_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/assign"),
        MANAGER,
        json!({ "assignee_id": TECH_FREE }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["ticket"]["assigned_to"], TECH_FREE);
    assert_eq!(data["ticket"]["status"], "in_progress");
    assert_eq!(data["notice"]["is_system_message"], true);
    assert_eq!(
        data["notice"]["message"],
        "Ticket has been assigned to Riley Chen from Technical department."
    );
}

#[tokio::test]
async fn test_agents_cannot_assign() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let response = post_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/assign"),
        TECH_BUSY,
        json!({ "assignee_id": TECH_BUSY }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failed_assignment_is_a_sanitized_500_and_changes_nothing() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    t.store.fail(FailPoint::AssignTicket);

    let response = post_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/assign"),
        MANAGER,
        json!({ "assignee_id": TECH_FREE }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "An internal error occurred");

    let ticket = t.store.find_ticket(id).await.expect("ticket lookup should succeed").unwrap();
    assert_eq!(ticket.assigned_to, None);
    assert!(t.store.list_messages(id).await.expect("listing messages should succeed").is_empty());
}

#[tokio::test]
async fn test_save_changes_writes_only_differences() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "general").await;
    let before = t.store.find_ticket(id).await.expect("ticket lookup should succeed").unwrap();

    let response = patch_as(
        &t.app,
        &format!("/api/v1/tickets/{id}"),
        MANAGER,
        json!({ "name": "Printer on fire", "priority": "critical", "category": "general" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let ticket = &body_json(response).await["data"];
    assert_eq!(ticket["name"], "Printer on fire");
    assert_eq!(ticket["priority"], "critical");

    let after = t.store.find_ticket(id).await.expect("ticket lookup should succeed").unwrap();
    assert!(after.updated_at > before.updated_at);
}

#[tokio::test]
async fn test_messages_carry_server_side_sender_type() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let uri = format!("/api/v1/tickets/{id}/messages");

    let from_customer = post_as(&t.app, &uri, CUSTOMER, json!({ "message": "Hello" })).await;
    assert_eq!(from_customer.status(), StatusCode::CREATED);
    assert_eq!(body_json(from_customer).await["data"]["sender_type"], "customer");

    let from_agent = post_as(&t.app, &uri, TECH_FREE, json!({ "message": "On it" })).await;
    assert_eq!(body_json(from_agent).await["data"]["sender_type"], "employee");

    let json = body_json(get_as(&t.app, &uri, CUSTOMER).await).await;
    let texts: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Hello", "On it"]);
}

#[tokio::test]
async fn test_blank_message_posts_nothing() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let response = post_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/messages"),
        CUSTOMER,
        json!({ "message": "   " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(t.store.list_messages(id).await.expect("listing messages should succeed").is_empty());
}

#[tokio::test]
async fn test_customers_cannot_post_system_messages() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let response = post_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/messages"),
        CUSTOMER,
        json!({ "message": "Ticket closed", "is_system_message": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_removes_ticket_and_conversation() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    post_as(&t.app, &format!("/api/v1/tickets/{id}/messages"), CUSTOMER, json!({ "message": "Hi" })).await;

    let response = delete_as(&t.app, &format!("/api/v1/tickets/{id}"), MANAGER).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let gone = get_as(&t.app, &format!("/api/v1/tickets/{id}"), MANAGER).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert!(t.store.list_messages(id).await.expect("listing messages should succeed").is_empty());
}

#[tokio::test]
async fn test_failed_message_delete_keeps_the_ticket() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    t.store.fail(FailPoint::DeleteMessages);

    let response = delete_as(&t.app, &format!("/api/v1/tickets/{id}"), MANAGER).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(t.store.find_ticket(id).await.expect("ticket lookup should succeed").is_some());
}

#[tokio::test]
async fn test_roster_filters_by_department() {
    let t = build_test_app();
    let json = body_json(get_as(&t.app, "/api/v1/employees?department=technical", TECH_FREE).await).await;
    let ids: Vec<i64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![TECH_BUSY, TECH_FREE]);

    let refused = get_as(&t.app, "/api/v1/employees", CUSTOMER).await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_employee_metrics_are_self_or_manager() {
    let t = build_test_app();
    let id = open_ticket(&t.app, CUSTOMER, "technical").await;
    let assigned = post_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/assign"),
        MANAGER,
        json!({ "assignee_id": TECH_FREE }),
    )
    .await;
    assert_eq!(assigned.status(), StatusCode::OK);
    post_as(
        &t.app,
        &format!("/api/v1/tickets/{id}/messages"),
        TECH_FREE,
        json!({ "message": "On it" }),
    )
    .await;

    let uri = format!("/api/v1/employees/{TECH_FREE}/metrics");
    let own = get_as(&t.app, &uri, TECH_FREE).await;
    assert_eq!(own.status(), StatusCode::OK);
    let data = &body_json(own).await["data"];
    assert_eq!(data["employee_id"], TECH_FREE);
    assert_eq!(data["total_tickets_assigned"], 1);
    assert_eq!(data["current_open_tickets"], 1);
    assert_eq!(data["tickets_by_category"]["technical"], 1);
    assert_eq!(data["total_messages_sent"], 1);
    assert_eq!(data["avg_messages_per_ticket"], 1.0);

    assert_eq!(get_as(&t.app, &uri, MANAGER).await.status(), StatusCode::OK);
    assert_eq!(get_as(&t.app, &uri, TECH_BUSY).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(get_as(&t.app, &uri, CUSTOMER).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        get_as(&t.app, "/api/v1/employees/424242/metrics", MANAGER).await.status(),
        StatusCode::NOT_FOUND
    );
}
