mod common;

use assert_matches::assert_matches;
use common::*;
use helpdesk_core::error::CoreError;
use helpdesk_core::ticket::{TicketCategory, TicketStatus};
use helpdesk_db::models::ticket::{CreateTicket, Ticket};
use helpdesk_db::{MessageStore, StoreError, TicketStore};
use helpdesk_desk::{AssignmentService, DeskError, FailPoint, TicketService};

async fn ticket(desk: &Desk, category: TicketCategory) -> Ticket {
    TicketService::new(desk.dyn_store())
        .create(
            &desk.identity(CUSTOMER).await,
            CreateTicket {
                category,
                priority: None,
                name: None,
            },
        )
        .await
        .expect("create should succeed")
}

#[tokio::test]
async fn test_recommends_least_loaded_in_department() {
    let desk = desk();
    let service = AssignmentService::new(desk.dyn_store());
    let manager = desk.identity(MANAGER).await;

    // TECH_BUSY carries three open tickets, TECH_FREE one, BILLING none.
    for assignee in [TECH_BUSY, TECH_BUSY, TECH_BUSY, TECH_FREE] {
        let t = ticket(&desk, TicketCategory::Technical).await;
        service.assign(&manager, t.id, assignee).await.expect("assignment should succeed");
    }

    let fresh = ticket(&desk, TicketCategory::Technical).await;
    let choice = service.recommend(&manager, fresh.id)
        .await
        .expect("recommendation should succeed")
        .unwrap();
    assert_eq!(choice.id, TECH_FREE);
    assert_eq!(choice.unresolved_tickets, 1);
}

#[tokio::test]
async fn test_recommends_global_least_loaded_without_department_match() {
    let desk = desk();
    let service = AssignmentService::new(desk.dyn_store());
    let manager = desk.identity(MANAGER).await;
    let feedback = ticket(&desk, TicketCategory::Feedback).await;

    let choice = service.recommend(&manager, feedback.id)
        .await
        .expect("recommendation should succeed")
        .unwrap();
    // Everyone is idle; the roster is ordered by load then id.
    assert_eq!(choice.id, MANAGER);
}

#[tokio::test]
async fn test_assignment_posts_notice_and_starts_work() {
    let desk = desk();
    let service = AssignmentService::new(desk.dyn_store());
    let t = ticket(&desk, TicketCategory::Technical).await;

    let (assigned, notice) = service
        .assign(&desk.identity(MANAGER).await, t.id, TECH_FREE)
        .await
        .expect("assignment should succeed");

    assert_eq!(assigned.assigned_to, Some(TECH_FREE));
    assert_eq!(assigned.status, TicketStatus::InProgress);
    assert!(assigned.updated_at > t.updated_at);
    assert_eq!(
        notice.message,
        "Ticket has been assigned to Riley Chen from Technical department."
    );
    assert_eq!(notice.created_by, MANAGER);
}

#[tokio::test]
async fn test_assigning_a_closed_ticket_keeps_it_closed() {
    let desk = desk();
    let t = ticket(&desk, TicketCategory::Billing).await;
    TicketService::new(desk.dyn_store())
        .update_status(&desk.identity(BILLING).await, t.id, TicketStatus::Closed)
        .await
        .unwrap();

    let (assigned, _) = AssignmentService::new(desk.dyn_store())
        .assign(&desk.identity(MANAGER).await, t.id, BILLING)
        .await
        .expect("assignment should succeed");
    assert_eq!(assigned.status, TicketStatus::Closed);
}

#[tokio::test]
async fn test_failed_assignment_changes_nothing() {
    let desk = desk();
    let t = ticket(&desk, TicketCategory::Technical).await;
    desk.store.fail(FailPoint::AssignTicket);

    let result = AssignmentService::new(desk.dyn_store())
        .assign(&desk.identity(MANAGER).await, t.id, TECH_FREE)
        .await;

    assert_matches!(result, Err(DeskError::Store(StoreError::Backend(_))));
    let stored = desk.store.find_ticket(t.id).await.expect("ticket lookup should succeed").unwrap();
    assert_eq!(stored.assigned_to, None);
    assert_eq!(stored.status, TicketStatus::Fresh);
    assert!(desk
        .store
        .list_messages(t.id)
        .await
        .expect("listing messages should succeed")
        .is_empty());
}

#[tokio::test]
async fn test_agents_cannot_assign() {
    let desk = desk();
    let t = ticket(&desk, TicketCategory::Technical).await;
    let result = AssignmentService::new(desk.dyn_store())
        .assign(&desk.identity(TECH_BUSY).await, t.id, TECH_BUSY)
        .await;
    assert_matches!(result, Err(DeskError::Core(CoreError::Forbidden(_))));
}

#[tokio::test]
async fn test_unknown_assignee_is_not_found() {
    let desk = desk();
    let t = ticket(&desk, TicketCategory::Technical).await;
    let result = AssignmentService::new(desk.dyn_store())
        .assign(&desk.identity(MANAGER).await, t.id, STRANGER)
        .await;
    assert_matches!(
        result,
        Err(DeskError::Core(CoreError::NotFound { entity: "employee", .. }))
    );
}

#[tokio::test]
async fn test_roster_filters_by_department_case_insensitively() {
    let desk = desk();
    let roster = AssignmentService::new(desk.dyn_store())
        .roster(&desk.identity(TECH_BUSY).await, Some("TECHNICAL"))
        .await
        .unwrap();
    let ids: Vec<_> = roster.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![TECH_BUSY, TECH_FREE]);
}
