mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::*;
use helpdesk_core::error::CoreError;
use helpdesk_core::ticket::{TicketCategory, TicketPriority, TicketStatus};
use helpdesk_db::models::approval_request::{ReviewDecision, SubmitArticle};
use helpdesk_db::models::article::CreateArticle;
use helpdesk_db::models::ticket::{CreateTicket, Ticket};
use helpdesk_desk::{
    Applied, ArticleReview, AssignmentService, DeskError, MessageService, RosterView, TicketService,
};

async fn ticket(desk: &Desk, priority: TicketPriority) -> Ticket {
    TicketService::new(desk.dyn_store())
        .create(
            &desk.identity(CUSTOMER).await,
            CreateTicket {
                category: TicketCategory::Technical,
                priority: Some(priority),
                name: None,
            },
        )
        .await
        .expect("ticket creation should succeed")
}

fn load_of(view: &RosterView, id: i64) -> i64 {
    view.get(id).expect("employee should be listed").unresolved_tickets
}

#[tokio::test]
async fn test_roster_view_follows_assignments() {
    let desk = desk();
    let mut view = RosterView::open(desk.session(MANAGER).await, Some("technical"))
        .await
        .expect("roster should open");
    assert_eq!(view.employees().len(), 2);
    assert_eq!(load_of(&view, TECH_FREE), 0);

    let t = ticket(&desk, TicketPriority::High).await;
    AssignmentService::new(desk.dyn_store())
        .assign(&desk.identity(MANAGER).await, t.id, TECH_FREE)
        .await
        .expect("assignment should succeed");

    assert!(view.drain_changes().await.expect("draining changes should succeed"));
    assert_eq!(load_of(&view, TECH_FREE), 1);
    assert_eq!(view.employees().last().map(|e| e.id), Some(TECH_FREE));

    // Nothing new: no refetch.
    assert!(!view.drain_changes().await.expect("draining changes should succeed"));
}

#[tokio::test]
async fn test_closing_a_ticket_lowers_the_load() {
    let desk = desk();
    let t = ticket(&desk, TicketPriority::Low).await;
    AssignmentService::new(desk.dyn_store())
        .assign(&desk.identity(MANAGER).await, t.id, TECH_BUSY)
        .await
        .expect("assignment should succeed");

    let mut view = RosterView::open(desk.session(TECH_BUSY).await, None)
        .await
        .expect("roster should open");
    assert_eq!(load_of(&view, TECH_BUSY), 1);

    TicketService::new(desk.dyn_store())
        .update_status(&desk.identity(TECH_BUSY).await, t.id, TicketStatus::Closed)
        .await
        .unwrap();

    let change = tokio::time::timeout(Duration::from_secs(1), view.next_change())
        .await
        .expect("a ticket event should arrive");
    assert_eq!(change, Some(Applied::Reloaded));
    assert_eq!(load_of(&view, TECH_BUSY), 0);
}

#[tokio::test]
async fn test_customers_cannot_open_the_roster() {
    let desk = desk();
    let result = RosterView::open(desk.session(CUSTOMER).await, None).await;
    assert_matches!(result, Err(DeskError::Core(CoreError::Forbidden(_))));
}

#[tokio::test]
async fn test_metrics_count_tickets_messages_and_articles() {
    let desk = desk();
    let manager = desk.identity(MANAGER).await;
    let agent = desk.identity(TECH_FREE).await;
    let assignment = AssignmentService::new(desk.dyn_store());

    let urgent = ticket(&desk, TicketPriority::Critical).await;
    let routine = ticket(&desk, TicketPriority::Low).await;
    for t in [&urgent, &routine] {
        assignment.assign(&manager, t.id, TECH_FREE).await.expect("assignment should succeed");
    }
    TicketService::new(desk.dyn_store())
        .update_status(&agent, routine.id, TicketStatus::Closed)
        .await
        .unwrap();

    let messages = MessageService::new(desk.dyn_store());
    for text in ["Looking into it", "Fixed on our side", "Please retry"] {
        messages.send(&agent, urgent.id, text).await.unwrap();
    }
    messages.send(&desk.identity(CUSTOMER).await, urgent.id, "Thanks").await.unwrap();

    let review = ArticleReview::new(desk.dyn_store());
    let mut ids = Vec::new();
    for title in ["Router resets", "VPN setup"] {
        let article = review
            .create(
                &agent,
                CreateArticle {
                    title: title.into(),
                    description: None,
                    content: "Step by step.".into(),
                    category: None,
                    is_faq: None,
                    tags: vec![],
                },
            )
            .await
            .expect("article creation should succeed");
        ids.push(article.id);
    }
    review
        .submit(&agent, ids[0], SubmitArticle { change_summary: None })
        .await
        .unwrap();
    review
        .approve(&manager, ids[0], ReviewDecision::default())
        .await
        .unwrap();
    review.read(&desk.identity(CUSTOMER).await, ids[0]).await.unwrap();

    let metrics = assignment
        .metrics(&agent, TECH_FREE)
        .await
        .expect("own metrics should load");

    assert_eq!(metrics.full_name, "Riley Chen");
    assert_eq!(metrics.total_tickets_assigned, 2);
    assert_eq!(metrics.total_tickets_resolved, 1);
    assert_eq!(metrics.current_open_tickets, 1);
    assert_eq!(metrics.tickets_by_priority.get("critical"), Some(&1));
    assert_eq!(metrics.tickets_by_priority.get("low"), Some(&1));
    assert_eq!(metrics.tickets_by_category.get("technical"), Some(&2));
    // Assignment notices are system messages and are not counted.
    assert_eq!(metrics.total_messages_sent, 3);
    assert_eq!(metrics.avg_messages_per_ticket, 1.5);
    assert_eq!(metrics.total_articles_created, 2);
    assert_eq!(metrics.total_articles_published, 1);
    assert_eq!(metrics.article_approval_rate, 50.0);
    assert_eq!(metrics.total_article_views, 1);
    assert_eq!(metrics.articles_by_category.get("general"), Some(&2));
}

#[tokio::test]
async fn test_metrics_of_others_are_for_managers() {
    let desk = desk();
    let assignment = AssignmentService::new(desk.dyn_store());

    assert_matches!(
        assignment.metrics(&desk.identity(TECH_BUSY).await, TECH_FREE).await,
        Err(DeskError::Core(CoreError::Forbidden(_)))
    );
    let idle = assignment
        .metrics(&desk.identity(MANAGER).await, BILLING)
        .await
        .expect("managers should see anyone");
    assert_eq!(idle.total_tickets_assigned, 0);
    assert_eq!(idle.avg_messages_per_ticket, 0.0);
    assert_matches!(
        assignment.metrics(&desk.identity(MANAGER).await, STRANGER).await,
        Err(DeskError::Core(CoreError::NotFound { entity: "employee", .. }))
    );
}
