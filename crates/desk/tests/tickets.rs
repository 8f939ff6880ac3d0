mod common;

use assert_matches::assert_matches;
use common::*;
use helpdesk_core::error::CoreError;
use helpdesk_core::ticket::{TicketCategory, TicketPriority, TicketStatus};
use helpdesk_db::models::message::NewMessage;
use helpdesk_db::models::ticket::{CreateTicket, TicketChanges, TicketScope};
use helpdesk_db::{MessageStore, StoreError, TicketStore};
use helpdesk_desk::{Applied, DeskError, FailPoint, TicketDesk, TicketService};
use helpdesk_core::message::SenderType;

fn billing() -> CreateTicket {
    CreateTicket {
        category: TicketCategory::Billing,
        priority: None,
        name: None,
    }
}

#[tokio::test]
async fn test_create_requires_a_creator() {
    let desk = desk();
    let service = TicketService::new(desk.dyn_store());
    let stranger = desk.identity(STRANGER).await;
    assert_matches!(
        service.create(&stranger, billing()).await,
        Err(DeskError::Core(CoreError::Unauthorized(_)))
    );
}

#[tokio::test]
async fn test_new_ticket_is_fresh_with_default_priority() {
    let desk = desk();
    let service = TicketService::new(desk.dyn_store());
    let customer = desk.identity(CUSTOMER).await;
    let ticket = service.create(&customer, billing()).await.expect("create should succeed");
    assert_eq!(ticket.status, TicketStatus::Fresh);
    assert_eq!(ticket.priority, TicketPriority::Medium);
    assert_eq!(ticket.created_by, CUSTOMER);
    assert!(!ticket.resolved);
}

#[tokio::test]
async fn test_customers_only_list_their_own_tickets() {
    let desk = desk();
    let service = TicketService::new(desk.dyn_store());
    let customer = desk.identity(CUSTOMER).await;
    let other = desk.identity(OTHER_CUSTOMER).await;
    service.create(&customer, billing()).await.expect("create should succeed");
    let theirs = service.create(&other, billing()).await.expect("create should succeed");

    let listed = service.list(&customer, TicketScope::All).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].created_by, CUSTOMER);

    assert_matches!(
        service.get(&customer, theirs.id).await,
        Err(DeskError::Core(CoreError::Forbidden(_)))
    );
}

#[tokio::test]
async fn test_unassigned_queue_is_for_managers() {
    let desk = desk();
    let agent = desk.identity(TECH_BUSY).await;
    assert_matches!(
        TicketService::scope_for(&agent, TicketScope::Unassigned),
        Err(DeskError::Core(CoreError::Forbidden(_)))
    );
    let manager = desk.identity(MANAGER).await;
    assert_eq!(
        TicketService::scope_for(&manager, TicketScope::Unassigned).unwrap(),
        TicketScope::Unassigned
    );
}

#[tokio::test]
async fn test_delete_removes_ticket_and_every_message() {
    let desk = desk();
    let service = TicketService::new(desk.dyn_store());
    let customer = desk.identity(CUSTOMER).await;
    let manager = desk.identity(MANAGER).await;
    let ticket = service.create(&customer, billing()).await.expect("create should succeed");
    for n in 0..3 {
        desk.store
            .insert_message(&NewMessage {
                ticket_id: ticket.id,
                message: format!("message {n}"),
                created_by: CUSTOMER,
                sender_type: SenderType::Customer,
                is_system_message: false,
            })
            .await
            .expect("message insert should succeed");
    }

    service.delete(&manager, ticket.id).await.unwrap();

    assert_eq!(
        desk
            .store
            .find_ticket(ticket.id)
            .await
            .expect("ticket lookup should succeed"),
        None
    );
    assert!(desk
        .store
        .list_messages(ticket.id)
        .await
        .expect("listing messages should succeed")
        .is_empty());
}

#[tokio::test]
async fn test_failed_message_delete_keeps_the_ticket() {
    let desk = desk();
    let service = TicketService::new(desk.dyn_store());
    let customer = desk.identity(CUSTOMER).await;
    let manager = desk.identity(MANAGER).await;
    let ticket = service.create(&customer, billing()).await.expect("create should succeed");
    desk.store.fail(FailPoint::DeleteMessages);

    assert_matches!(
        service.delete(&manager, ticket.id).await,
        Err(DeskError::Store(StoreError::Backend(_)))
    );
    assert!(desk
        .store
        .find_ticket(ticket.id)
        .await
        .expect("ticket lookup should succeed")
        .is_some());
}

#[tokio::test]
async fn test_agents_cannot_delete() {
    let desk = desk();
    let service = TicketService::new(desk.dyn_store());
    let customer = desk.identity(CUSTOMER).await;
    let agent = desk.identity(TECH_FREE).await;
    let ticket = service.create(&customer, billing()).await.expect("create should succeed");
    assert_matches!(
        service.delete(&agent, ticket.id).await,
        Err(DeskError::Core(CoreError::Forbidden(_)))
    );
}

#[tokio::test]
async fn test_desk_converges_with_its_own_echo() {
    let desk = desk();
    let customer = desk.identity(CUSTOMER).await;
    let ticket = TicketService::new(desk.dyn_store())
        .create(&customer, billing())
        .await
        .expect("create should succeed");

    let mut view = TicketDesk::open(desk.session(TECH_FREE).await, TicketScope::All)
        .await
        .unwrap();
    // The create event was published before the view subscribed.
    assert_eq!(view.drain_changes().await.expect("draining changes should succeed"), 0);

    let updated = view
        .update_priority(ticket.id, TicketPriority::High)
        .await
        .unwrap();
    assert!(view.collection().is_pending(ticket.id));

    assert_eq!(view.next_change().await, Some(Applied::Confirmed));
    assert!(!view.collection().is_pending(ticket.id));
    assert_eq!(view.tickets(), vec![updated]);
}

#[tokio::test]
async fn test_failed_update_is_rolled_back() {
    let desk = desk();
    let customer = desk.identity(CUSTOMER).await;
    let ticket = TicketService::new(desk.dyn_store())
        .create(&customer, billing())
        .await
        .expect("create should succeed");
    let mut view = TicketDesk::open(desk.session(TECH_FREE).await, TicketScope::All)
        .await
        .unwrap();
    desk.store.fail(FailPoint::UpdateTicket);

    let result = view.update_status(ticket.id, TicketStatus::Closed).await;

    assert_matches!(result, Err(DeskError::Store(StoreError::Backend(_))));
    assert_eq!(view.get(ticket.id).unwrap().status, TicketStatus::Fresh);
    assert!(view.error().is_some());
}

#[tokio::test]
async fn test_other_viewers_see_touch_reorder() {
    let desk = desk();
    let service = TicketService::new(desk.dyn_store());
    let customer = desk.identity(CUSTOMER).await;
    let older = service.create(&customer, billing()).await.expect("create should succeed");
    let newer = service.create(&customer, billing()).await.expect("create should succeed");

    let mut view = TicketDesk::open(desk.session(MANAGER).await, TicketScope::All)
        .await
        .unwrap();
    assert_eq!(view.tickets()[0].id, newer.id);

    service.touch(&customer, older.id).await.unwrap();
    assert_eq!(view.next_change().await, Some(Applied::Merged));
    assert_eq!(view.tickets()[0].id, older.id);
}

#[tokio::test]
async fn test_unassigned_queue_drops_assigned_tickets() {
    let desk = desk();
    let customer = desk.identity(CUSTOMER).await;
    let ticket = TicketService::new(desk.dyn_store())
        .create(&customer, billing())
        .await
        .expect("create should succeed");
    let mut queue = TicketDesk::open(desk.session(MANAGER).await, TicketScope::Unassigned)
        .await
        .unwrap();
    assert_eq!(queue.tickets().len(), 1);

    let (assigned, notice) = queue.assign(ticket.id, BILLING)
        .await
        .expect("assignment should succeed");
    assert_eq!(assigned.status, TicketStatus::InProgress);
    assert!(notice.is_system_message);
    assert!(queue.tickets().is_empty());
}

#[tokio::test]
async fn test_save_changes_writes_only_changed_fields_and_touches() {
    let desk = desk();
    let customer = desk.identity(CUSTOMER).await;
    let ticket = TicketService::new(desk.dyn_store())
        .create(&customer, billing())
        .await
        .expect("create should succeed");
    let mut view = TicketDesk::open(desk.session(MANAGER).await, TicketScope::All)
        .await
        .unwrap();

    let saved = view
        .save_changes(
            ticket.id,
            TicketChanges {
                name: Some("  Refund request ".into()),
                category: Some(TicketCategory::Billing),
                priority: Some(TicketPriority::Critical),
                assigned_to: Some(BILLING),
            },
        )
        .await
        .unwrap();

    assert_eq!(saved.name, "Refund request");
    assert_eq!(saved.priority, TicketPriority::Critical);
    assert_eq!(saved.assigned_to, Some(BILLING));
    assert_eq!(saved.status, TicketStatus::InProgress);
    assert!(saved.updated_at > ticket.updated_at);

    let messages = desk.store.list_messages(ticket.id)
        .await
        .expect("listing messages should succeed");
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].message,
        "Ticket has been assigned to Jo Park from billing department."
    );
}

#[tokio::test]
async fn test_view_releases_subscription_on_sign_out() {
    let desk = desk();
    let session = desk.session(MANAGER).await;
    let mut view = TicketDesk::open(session.clone(), TicketScope::All)
        .await
        .unwrap();
    assert_eq!(desk.bus.active_subscriptions(), 1);

    session.sign_out().await.expect("sign out should succeed");
    assert_eq!(view.next_change().await, None);
    assert!(!view.is_live());
    assert_eq!(desk.bus.active_subscriptions(), 0);
}
