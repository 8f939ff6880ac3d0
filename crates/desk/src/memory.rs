//! In-memory [`Store`] for tests and the `memory` backend.
//!
//! Behaves like `PgStore`: the same ordering, the same guarded transitions
//! and error classification, compound operations applied all or nothing,
//! and (when given a bus) the same change events the database triggers
//! would produce. Fail points make any operation fail on demand.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use helpdesk_core::article::{next_version_number, ApprovalStatus, ArticleStatus};
use helpdesk_core::message::SenderType;
use helpdesk_core::roles::Permission;
use helpdesk_core::ticket::{next_touch, status_after_assignment, TicketStatus};
use helpdesk_core::types::{DbId, Timestamp};
use helpdesk_db::models::approval_request::{ApprovalRequest, ResolveApproval, Resolution, Submission};
use helpdesk_db::models::article::{Article, ArticleFilter, NewArticle, UpdateArticle};
use helpdesk_db::models::article_note::ArticleNote;
use helpdesk_db::models::article_version::ArticleVersion;
use helpdesk_db::models::customer::Customer;
use helpdesk_db::models::employee::{Employee, EmployeeWithLoad, MetricCounts};
use helpdesk_db::models::message::{Message, NewMessage};
use helpdesk_db::models::ticket::{AssignTicket, NewTicket, Ticket, TicketScope, UpdateTicket};
use helpdesk_db::{ArticleStore, DirectoryStore, MessageStore, Store, StoreError, TicketStore};
use helpdesk_events::{ChangeBus, ChangeEvent, ChangeKind, Table};
use serde::Serialize;

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertTicket,
    ListTickets,
    UpdateTicket,
    TouchTicket,
    AssignTicket,
    DeleteTicket,
    InsertMessage,
    ListMessages,
    DeleteMessages,
    SaveArticle,
    SubmitForApproval,
    ResolveApproval,
    IncrementViewCount,
}

#[derive(Default)]
struct State {
    last_id: DbId,
    clock: Option<Timestamp>,
    tickets: BTreeMap<DbId, Ticket>,
    messages: BTreeMap<DbId, Message>,
    employees: BTreeMap<DbId, Employee>,
    customers: BTreeMap<DbId, Customer>,
    articles: BTreeMap<DbId, Article>,
    versions: BTreeMap<DbId, ArticleVersion>,
    requests: BTreeMap<DbId, ApprovalRequest>,
    notes: BTreeMap<DbId, ArticleNote>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    /// Wall clock, forced strictly increasing.
    fn now(&mut self) -> Timestamp {
        let now = match self.clock {
            Some(previous) => next_touch(previous, Utc::now()),
            None => Utc::now(),
        };
        self.clock = Some(now);
        now
    }

    fn ticket_mut(&mut self, id: DbId) -> Result<&mut Ticket, StoreError> {
        self.tickets
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("ticket", id))
    }

    fn article_mut(&mut self, id: DbId) -> Result<&mut Article, StoreError> {
        self.articles
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("article", id))
    }

    fn touch(&mut self, id: DbId) -> Result<Ticket, StoreError> {
        let now = self.now();
        let ticket = self.ticket_mut(id)?;
        ticket.updated_at = next_touch(ticket.updated_at, now);
        Ok(ticket.clone())
    }

    fn insert_message(&mut self, input: &NewMessage) -> Result<Message, StoreError> {
        if !self.tickets.contains_key(&input.ticket_id) {
            return Err(StoreError::Conflict("referenced row does not exist".into()));
        }
        let message = Message {
            id: self.next_id(),
            ticket_id: input.ticket_id,
            message: input.message.clone(),
            created_by: input.created_by,
            sender_type: input.sender_type,
            is_system_message: input.is_system_message,
            created_at: self.now(),
        };
        self.messages.insert(message.id, message.clone());
        Ok(message)
    }

    fn unresolved_tickets(&self, employee_id: DbId) -> i64 {
        self.tickets
            .values()
            .filter(|t| t.assigned_to == Some(employee_id) && t.status != TicketStatus::Closed)
            .count() as i64
    }

    /// Move an article between statuses, as the guarded SQL update does.
    fn transition(&mut self, id: DbId, from: ArticleStatus, to: ArticleStatus) -> Result<Article, StoreError> {
        let now = self.now();
        let article = self.article_mut(id)?;
        if article.status != from {
            return Err(StoreError::Conflict(format!(
                "article {id} is {} (expected {from})",
                article.status
            )));
        }
        article.status = to;
        article.updated_at = now;
        if to == ArticleStatus::Approved {
            article.published_at = Some(now);
        }
        Ok(article.clone())
    }
}

pub struct MemoryStore {
    state: Mutex<State>,
    fail_points: Mutex<HashSet<FailPoint>>,
    bus: Option<Arc<ChangeBus>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail_points: Mutex::new(HashSet::new()),
            bus: None,
        }
    }

    /// Publish change events on `bus` after every write.
    pub fn with_bus(mut self, bus: Arc<ChangeBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Make `point` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, point: FailPoint) {
        if let Ok(mut points) = self.fail_points.lock() {
            points.insert(point);
        }
    }

    pub fn heal(&self, point: FailPoint) {
        if let Ok(mut points) = self.fail_points.lock() {
            points.remove(&point);
        }
    }

    // -- seeding -----------------------------------------------------------

    pub fn add_employee(
        &self,
        id: DbId,
        full_name: &str,
        department: &str,
        permissions: Permission,
    ) -> Result<Employee, StoreError> {
        let mut state = self.lock()?;
        let employee = Employee {
            id,
            full_name: full_name.to_string(),
            department: department.to_string(),
            permissions,
            created_at: state.now(),
        };
        state.employees.insert(id, employee.clone());
        Ok(employee)
    }

    pub fn add_customer(&self, id: DbId, full_name: Option<&str>) -> Result<Customer, StoreError> {
        let mut state = self.lock()?;
        let customer = Customer {
            id,
            full_name: full_name.map(str::to_string),
            email: None,
            created_at: state.now(),
        };
        state.customers.insert(id, customer.clone());
        Ok(customer)
    }

    // -- internals ---------------------------------------------------------

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        let failing = self
            .fail_points
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))?
            .contains(&point);
        if failing {
            return Err(StoreError::Backend(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn publish(&self, events: Vec<ChangeEvent>) {
        if let Some(bus) = &self.bus {
            for event in events {
                bus.publish(event);
            }
        }
    }
}

fn changed<T: Serialize>(
    table: Table,
    kind: ChangeKind,
    id: DbId,
    scope: Option<DbId>,
    row: &T,
) -> Option<ChangeEvent> {
    match ChangeEvent::upsert(table, kind, id, row) {
        Ok(event) => Some(event.with_scope(scope)),
        Err(e) => {
            tracing::error!(error = %e, table = %table, id, "Failed to encode change event");
            None
        }
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, input: &NewTicket) -> Result<Ticket, StoreError> {
        self.check(FailPoint::InsertTicket)?;
        let ticket = {
            let mut state = self.lock()?;
            let now = state.now();
            let ticket = Ticket {
                id: state.next_id(),
                status: TicketStatus::Fresh,
                priority: input.priority,
                category: input.category,
                created_by: input.created_by,
                assigned_to: None,
                name: input.name.clone(),
                resolved: false,
                created_at: now,
                updated_at: now,
            };
            state.tickets.insert(ticket.id, ticket.clone());
            ticket
        };
        self.publish(changed(Table::Tickets, ChangeKind::Insert, ticket.id, None, &ticket).into_iter().collect());
        Ok(ticket)
    }

    async fn find_ticket(&self, id: DbId) -> Result<Option<Ticket>, StoreError> {
        Ok(self.lock()?.tickets.get(&id).cloned())
    }

    async fn list_tickets(&self, scope: TicketScope) -> Result<Vec<Ticket>, StoreError> {
        self.check(FailPoint::ListTickets)?;
        let state = self.lock()?;
        let mut rows: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| match scope {
                TicketScope::All => true,
                TicketScope::CreatedBy(user) => t.created_by == user,
                TicketScope::AssignedTo(user) => t.assigned_to == Some(user),
                TicketScope::Unassigned => t.assigned_to.is_none(),
            })
            .cloned()
            .collect();
        match scope {
            TicketScope::Unassigned => {
                rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            }
            _ => rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id))),
        }
        Ok(rows)
    }

    async fn update_ticket(&self, id: DbId, patch: &UpdateTicket) -> Result<Ticket, StoreError> {
        self.check(FailPoint::UpdateTicket)?;
        let ticket = {
            let mut state = self.lock()?;
            let ticket = state.ticket_mut(id)?;
            if let Some(status) = patch.status {
                ticket.status = status;
                ticket.resolved = status.is_resolved();
            }
            if let Some(priority) = patch.priority {
                ticket.priority = priority;
            }
            if let Some(category) = patch.category {
                ticket.category = category;
            }
            if let Some(name) = &patch.name {
                ticket.name = name.clone();
            }
            ticket.clone()
        };
        self.publish(changed(Table::Tickets, ChangeKind::Update, id, None, &ticket).into_iter().collect());
        Ok(ticket)
    }

    async fn touch_ticket(&self, id: DbId) -> Result<Ticket, StoreError> {
        self.check(FailPoint::TouchTicket)?;
        let ticket = self.lock()?.touch(id)?;
        self.publish(changed(Table::Tickets, ChangeKind::Update, id, None, &ticket).into_iter().collect());
        Ok(ticket)
    }

    async fn assign_ticket(&self, input: &AssignTicket) -> Result<(Ticket, Message), StoreError> {
        self.check(FailPoint::AssignTicket)?;
        let (ticket, message) = {
            let mut state = self.lock()?;
            if !state.tickets.contains_key(&input.ticket_id) {
                return Err(StoreError::not_found("ticket", input.ticket_id));
            }
            if !state.employees.contains_key(&input.assignee_id) {
                return Err(StoreError::Conflict("referenced row does not exist".into()));
            }
            let message = state.insert_message(&NewMessage {
                ticket_id: input.ticket_id,
                message: input.notice.clone(),
                created_by: input.assigned_by,
                sender_type: SenderType::Employee,
                is_system_message: true,
            })?;
            let ticket = state.ticket_mut(input.ticket_id)?;
            ticket.assigned_to = Some(input.assignee_id);
            ticket.status = status_after_assignment(ticket.status);
            let ticket = state.touch(input.ticket_id)?;
            (ticket, message)
        };
        let events = [
            changed(Table::Tickets, ChangeKind::Update, ticket.id, None, &ticket),
            changed(Table::Messages, ChangeKind::Insert, message.id, Some(message.ticket_id), &message),
        ];
        self.publish(events.into_iter().flatten().collect());
        Ok((ticket, message))
    }

    async fn delete_ticket(&self, id: DbId) -> Result<bool, StoreError> {
        self.check(FailPoint::DeleteTicket)?;
        let cascaded = {
            let mut state = self.lock()?;
            if state.tickets.remove(&id).is_none() {
                return Ok(false);
            }
            let orphans: Vec<DbId> = state
                .messages
                .values()
                .filter(|m| m.ticket_id == id)
                .map(|m| m.id)
                .collect();
            for message_id in &orphans {
                state.messages.remove(message_id);
            }
            orphans
        };
        let mut events: Vec<ChangeEvent> = cascaded
            .into_iter()
            .map(|message_id| ChangeEvent::deleted(Table::Messages, message_id, Some(id)))
            .collect();
        events.push(ChangeEvent::deleted(Table::Tickets, id, None));
        self.publish(events);
        Ok(true)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, input: &NewMessage) -> Result<Message, StoreError> {
        self.check(FailPoint::InsertMessage)?;
        let message = self.lock()?.insert_message(input)?;
        self.publish(
            changed(Table::Messages, ChangeKind::Insert, message.id, Some(message.ticket_id), &message)
                .into_iter()
                .collect(),
        );
        Ok(message)
    }

    async fn list_messages(&self, ticket_id: DbId) -> Result<Vec<Message>, StoreError> {
        self.check(FailPoint::ListMessages)?;
        let state = self.lock()?;
        let mut rows: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.ticket_id == ticket_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn delete_messages_for_ticket(&self, ticket_id: DbId) -> Result<u64, StoreError> {
        self.check(FailPoint::DeleteMessages)?;
        let removed: Vec<DbId> = {
            let mut state = self.lock()?;
            let ids: Vec<DbId> = state
                .messages
                .values()
                .filter(|m| m.ticket_id == ticket_id)
                .map(|m| m.id)
                .collect();
            for id in &ids {
                state.messages.remove(id);
            }
            ids
        };
        let count = removed.len() as u64;
        self.publish(
            removed
                .into_iter()
                .map(|id| ChangeEvent::deleted(Table::Messages, id, Some(ticket_id)))
                .collect(),
        );
        Ok(count)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_employee(&self, id: DbId) -> Result<Option<Employee>, StoreError> {
        Ok(self.lock()?.employees.get(&id).cloned())
    }

    async fn find_customer(&self, id: DbId) -> Result<Option<Customer>, StoreError> {
        Ok(self.lock()?.customers.get(&id).cloned())
    }

    async fn list_employees_with_load(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<EmployeeWithLoad>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<EmployeeWithLoad> = state
            .employees
            .values()
            .filter(|e| {
                department.map_or(true, |d| d.trim().eq_ignore_ascii_case(e.department.trim()))
            })
            .map(|e| EmployeeWithLoad {
                id: e.id,
                full_name: e.full_name.clone(),
                department: e.department.clone(),
                permissions: e.permissions,
                unresolved_tickets: state.unresolved_tickets(e.id),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.unresolved_tickets
                .cmp(&b.unresolved_tickets)
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn employee_metric_counts(&self, id: DbId) -> Result<MetricCounts, StoreError> {
        let state = self.lock()?;
        let mut counts = MetricCounts::default();

        for ticket in state.tickets.values().filter(|t| t.assigned_to == Some(id)) {
            counts.tickets.assigned += 1;
            if ticket.status.is_resolved() {
                counts.tickets.resolved += 1;
            } else {
                counts.tickets.open += 1;
            }
            *counts
                .tickets_by_priority
                .entry(ticket.priority.to_string())
                .or_default() += 1;
            *counts
                .tickets_by_category
                .entry(ticket.category.to_string())
                .or_default() += 1;
        }

        counts.messages_sent = state
            .messages
            .values()
            .filter(|m| {
                m.created_by == id && m.sender_type == SenderType::Employee && !m.is_system_message
            })
            .count() as i64;

        for article in state.articles.values().filter(|a| a.created_by == id) {
            counts.articles.created += 1;
            if article.status == ArticleStatus::Approved {
                counts.articles.published += 1;
            }
            counts.articles.views += article.view_count;
            *counts
                .articles_by_category
                .entry(article.category.to_string())
                .or_default() += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, input: &NewArticle) -> Result<Article, StoreError> {
        let article = {
            let mut state = self.lock()?;
            if state.articles.values().any(|a| a.slug == input.slug) {
                return Err(StoreError::Conflict("unique constraint articles_slug_key".into()));
            }
            let now = state.now();
            let mut tags = input.tags.clone();
            tags.sort();
            let article = Article {
                id: state.next_id(),
                title: input.title.clone(),
                description: input.description.clone(),
                content: input.content.clone(),
                status: ArticleStatus::Draft,
                category: input.category,
                is_faq: input.is_faq,
                slug: input.slug.clone(),
                view_count: 0,
                created_by: input.created_by,
                created_at: now,
                updated_at: now,
                published_at: None,
                tags,
            };
            state.articles.insert(article.id, article.clone());
            article
        };
        self.publish(changed(Table::Articles, ChangeKind::Insert, article.id, None, &article).into_iter().collect());
        Ok(article)
    }

    async fn find_article(&self, id: DbId) -> Result<Option<Article>, StoreError> {
        Ok(self.lock()?.articles.get(&id).cloned())
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<Article> = state
            .articles
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn slugs_like(&self, base: &str) -> Result<Vec<String>, StoreError> {
        let prefix = format!("{base}-");
        Ok(self
            .lock()?
            .articles
            .values()
            .map(|a| &a.slug)
            .filter(|s| {
                *s == base
                    || s.strip_prefix(&prefix)
                        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
            })
            .cloned()
            .collect())
    }

    async fn save_article(
        &self,
        id: DbId,
        patch: &UpdateArticle,
        status: ArticleStatus,
    ) -> Result<Article, StoreError> {
        self.check(FailPoint::SaveArticle)?;
        let article = {
            let mut state = self.lock()?;
            let now = state.now();
            let article = state.article_mut(id)?;
            if let Some(title) = &patch.title {
                article.title = title.clone();
            }
            if let Some(description) = &patch.description {
                article.description = Some(description.clone());
            }
            if let Some(content) = &patch.content {
                article.content = content.clone();
            }
            if let Some(category) = patch.category {
                article.category = category;
            }
            if let Some(is_faq) = patch.is_faq {
                article.is_faq = is_faq;
            }
            if let Some(tags) = &patch.tags {
                let mut tags = tags.clone();
                tags.sort();
                tags.dedup();
                article.tags = tags;
            }
            article.status = status;
            article.updated_at = now;
            article.clone()
        };
        self.publish(changed(Table::Articles, ChangeKind::Update, id, None, &article).into_iter().collect());
        Ok(article)
    }

    async fn set_article_status(
        &self,
        id: DbId,
        from: ArticleStatus,
        to: ArticleStatus,
    ) -> Result<Article, StoreError> {
        let article = self.lock()?.transition(id, from, to)?;
        self.publish(changed(Table::Articles, ChangeKind::Update, id, None, &article).into_iter().collect());
        Ok(article)
    }

    async fn submit_for_approval(
        &self,
        article_id: DbId,
        submitted_by: DbId,
        change_summary: Option<&str>,
    ) -> Result<Submission, StoreError> {
        self.check(FailPoint::SubmitForApproval)?;
        let submission = {
            let mut state = self.lock()?;
            let current = state
                .articles
                .get(&article_id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("article", article_id))?;
            if current.status != ArticleStatus::Draft {
                return Err(StoreError::Conflict(format!("article {article_id} is not a draft")));
            }
            if state
                .requests
                .values()
                .any(|r| r.article_id == article_id && r.status == ApprovalStatus::Pending)
            {
                return Err(StoreError::Conflict(
                    "unique constraint uq_approval_requests_one_pending".into(),
                ));
            }

            let latest = state
                .versions
                .values()
                .filter(|v| v.article_id == article_id)
                .map(|v| v.version_number)
                .max();
            let now = state.now();
            let version = ArticleVersion {
                id: state.next_id(),
                article_id,
                title: current.title.clone(),
                description: current.description.clone(),
                content: current.content.clone(),
                version_number: next_version_number(latest),
                change_summary: change_summary.map(str::to_string),
                created_by: submitted_by,
                created_at: now,
            };
            let request = ApprovalRequest {
                id: state.next_id(),
                article_id,
                version_id: version.id,
                submitted_by,
                submitted_at: now,
                status: ApprovalStatus::Pending,
                reviewed_by: None,
                reviewed_at: None,
                feedback: None,
            };
            let article =
                state.transition(article_id, ArticleStatus::Draft, ArticleStatus::PendingApproval)?;
            state.versions.insert(version.id, version.clone());
            state.requests.insert(request.id, request.clone());
            Submission {
                article,
                version,
                request,
            }
        };
        let events = [
            changed(Table::Articles, ChangeKind::Update, article_id, None, &submission.article),
            changed(
                Table::ApprovalRequests,
                ChangeKind::Insert,
                submission.request.id,
                Some(article_id),
                &submission.request,
            ),
        ];
        self.publish(events.into_iter().flatten().collect());
        Ok(submission)
    }

    async fn resolve_approval(&self, input: &ResolveApproval) -> Result<Resolution, StoreError> {
        self.check(FailPoint::ResolveApproval)?;
        let target = input.decision.article_status().ok_or_else(|| {
            StoreError::Conflict("an approval can only be resolved as approved or rejected".into())
        })?;
        let resolution = {
            let mut state = self.lock()?;
            let request_id = state
                .requests
                .values()
                .find(|r| r.article_id == input.article_id && r.status == ApprovalStatus::Pending)
                .map(|r| r.id)
                .ok_or_else(|| {
                    StoreError::NotFound(format!(
                        "pending approval request for article {}",
                        input.article_id
                    ))
                })?;
            let pending = state
                .articles
                .get(&input.article_id)
                .is_some_and(|a| a.status == ArticleStatus::PendingApproval);
            if !pending {
                return Err(StoreError::Conflict(format!(
                    "article {} is not pending approval",
                    input.article_id
                )));
            }

            let article =
                state.transition(input.article_id, ArticleStatus::PendingApproval, target)?;
            let now = state.now();
            let note = match &input.feedback {
                Some(feedback) => {
                    let note = ArticleNote {
                        id: state.next_id(),
                        article_id: input.article_id,
                        content: feedback.clone(),
                        created_by: input.reviewer_id,
                        created_at: now,
                    };
                    state.notes.insert(note.id, note.clone());
                    Some(note)
                }
                None => None,
            };
            let request = state
                .requests
                .get_mut(&request_id)
                .ok_or_else(|| StoreError::not_found("approval request", request_id))?;
            request.status = input.decision;
            request.reviewed_by = Some(input.reviewer_id);
            request.reviewed_at = Some(now);
            request.feedback = input.feedback.clone();
            Resolution {
                article,
                request: request.clone(),
                note,
            }
        };
        let events = [
            changed(
                Table::ApprovalRequests,
                ChangeKind::Update,
                resolution.request.id,
                Some(input.article_id),
                &resolution.request,
            ),
            changed(Table::Articles, ChangeKind::Update, input.article_id, None, &resolution.article),
        ];
        self.publish(events.into_iter().flatten().collect());
        Ok(resolution)
    }

    async fn increment_view_count(&self, article_id: DbId) -> Result<i64, StoreError> {
        self.check(FailPoint::IncrementViewCount)?;
        let article = {
            let mut state = self.lock()?;
            let article = state.article_mut(article_id)?;
            article.view_count += 1;
            article.clone()
        };
        self.publish(changed(Table::Articles, ChangeKind::Update, article_id, None, &article).into_iter().collect());
        Ok(article.view_count)
    }

    async fn list_versions(&self, article_id: DbId) -> Result<Vec<ArticleVersion>, StoreError> {
        let mut rows: Vec<ArticleVersion> = self
            .lock()?
            .versions
            .values()
            .filter(|v| v.article_id == article_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(rows)
    }

    async fn list_approval_requests(
        &self,
        article_id: DbId,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        let mut rows: Vec<ApprovalRequest> = self
            .lock()?
            .requests
            .values()
            .filter(|r| r.article_id == article_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn insert_note(
        &self,
        article_id: DbId,
        created_by: DbId,
        content: &str,
    ) -> Result<ArticleNote, StoreError> {
        let mut state = self.lock()?;
        if !state.articles.contains_key(&article_id) {
            return Err(StoreError::Conflict("referenced row does not exist".into()));
        }
        let note = ArticleNote {
            id: state.next_id(),
            article_id,
            content: content.to_string(),
            created_by,
            created_at: state.now(),
        };
        state.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn list_notes(&self, article_id: DbId) -> Result<Vec<ArticleNote>, StoreError> {
        // Ids grow with creation time, so map order is creation order.
        Ok(self
            .lock()?
            .notes
            .values()
            .filter(|n| n.article_id == article_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use helpdesk_core::ticket::{TicketCategory, TicketPriority};

    fn new_ticket(created_by: DbId) -> NewTicket {
        NewTicket {
            category: TicketCategory::Billing,
            priority: TicketPriority::Medium,
            name: String::new(),
            created_by,
        }
    }

    #[tokio::test]
    async fn test_touch_strictly_increases_updated_at() {
        let store = MemoryStore::new();
        let ticket = store.insert_ticket(&new_ticket(1)).await.unwrap();
        let first = store.touch_ticket(ticket.id).await.unwrap();
        let second = store.touch_ticket(ticket.id).await.unwrap();
        assert!(first.updated_at > ticket.updated_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn test_update_does_not_touch() {
        let store = MemoryStore::new();
        let ticket = store.insert_ticket(&new_ticket(1)).await.unwrap();
        let patch = UpdateTicket {
            status: Some(TicketStatus::Closed),
            ..Default::default()
        };
        let updated = store.update_ticket(ticket.id, &patch).await.unwrap();
        assert!(updated.resolved);
        assert_eq!(updated.updated_at, ticket.updated_at);
    }

    #[tokio::test]
    async fn test_message_for_missing_ticket_is_conflict() {
        let store = MemoryStore::new();
        let result = store
            .insert_message(&NewMessage {
                ticket_id: 99,
                message: "hi".into(),
                created_by: 1,
                sender_type: SenderType::Customer,
                is_system_message: false,
            })
            .await;
        assert_matches!(result, Err(StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failed_assignment_leaves_ticket_untouched() {
        let store = MemoryStore::new();
        store
            .add_employee(5, "Ada", "billing", Permission::Agent)
            .unwrap();
        let ticket = store.insert_ticket(&new_ticket(1)).await.unwrap();
        store.fail(FailPoint::AssignTicket);

        let result = store
            .assign_ticket(&AssignTicket {
                ticket_id: ticket.id,
                assignee_id: 5,
                assigned_by: 2,
                notice: "assigned".into(),
            })
            .await;
        assert_matches!(result, Err(StoreError::Backend(_)));
        assert_eq!(store.find_ticket(ticket.id).await.unwrap(), Some(ticket.clone()));
        assert!(store.list_messages(ticket.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assignment_to_unknown_employee_writes_nothing() {
        let store = MemoryStore::new();
        let ticket = store.insert_ticket(&new_ticket(1)).await.unwrap();
        let result = store
            .assign_ticket(&AssignTicket {
                ticket_id: ticket.id,
                assignee_id: 404,
                assigned_by: 2,
                notice: "assigned".into(),
            })
            .await;
        assert_matches!(result, Err(StoreError::Conflict(_)));
        assert!(store.list_messages(ticket.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_roster_load_ignores_closed_tickets() {
        let store = MemoryStore::new();
        store.add_employee(5, "Ada", "Technical", Permission::Agent).unwrap();
        for _ in 0..2 {
            let ticket = store.insert_ticket(&new_ticket(1)).await.unwrap();
            store
                .assign_ticket(&AssignTicket {
                    ticket_id: ticket.id,
                    assignee_id: 5,
                    assigned_by: 2,
                    notice: "assigned".into(),
                })
                .await
                .unwrap();
        }
        let closed = store.list_tickets(TicketScope::AssignedTo(5)).await.unwrap()[0].id;
        store
            .update_ticket(
                closed,
                &UpdateTicket {
                    status: Some(TicketStatus::Closed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let roster = store.list_employees_with_load(Some("technical")).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].unresolved_tickets, 1);
    }

    #[tokio::test]
    async fn test_slugs_like_matches_numbered_suffixes_only() {
        let store = MemoryStore::new();
        for slug in ["reset-password", "reset-password-2", "reset-password-tips"] {
            store
                .insert_article(&NewArticle {
                    title: slug.into(),
                    description: None,
                    content: String::new(),
                    category: Default::default(),
                    is_faq: false,
                    slug: slug.into(),
                    tags: vec![],
                    created_by: 1,
                })
                .await
                .unwrap();
        }
        let mut slugs = store.slugs_like("reset-password").await.unwrap();
        slugs.sort();
        assert_eq!(slugs, vec!["reset-password", "reset-password-2"]);
    }
}
