//! Ticket store adapter and the synchronized ticket list.

use std::sync::Arc;

use chrono::Utc;
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::ticket::{
    next_touch, status_after_assignment, validate_ticket_name, TicketCategory, TicketPriority,
    TicketStatus,
};
use helpdesk_core::types::DbId;
use helpdesk_db::models::message::Message;
use helpdesk_db::models::ticket::{CreateTicket, NewTicket, Ticket, TicketChanges, TicketScope, UpdateTicket};
use helpdesk_db::Store;
use helpdesk_events::{Subscription, Table, Topic};

use crate::access::{AccessResolver, Requirement};
use crate::assignment::AssignmentService;
use crate::error::{store_failure, DeskError, DeskResult};
use crate::session::SessionContext;
use crate::sync::feed::{self, Feed};
use crate::sync::{by_updated_desc, ticket_by_created_asc, Applied, SyncedCollection};

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Ticket operations against the store. Every call re-checks the caller.
#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn Store>,
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The scope a caller may actually list: customers only ever see their
    /// own tickets and the unassigned queue is for managers.
    pub fn scope_for(caller: &ResolvedIdentity, requested: TicketScope) -> DeskResult<TicketScope> {
        let user_id = AccessResolver::check(caller, Requirement::Authenticated)?;
        if !caller.is_staff() {
            return Ok(TicketScope::CreatedBy(user_id));
        }
        if requested == TicketScope::Unassigned {
            AccessResolver::check(caller, Requirement::Manager)?;
        }
        Ok(requested)
    }

    pub async fn create(&self, caller: &ResolvedIdentity, input: CreateTicket) -> DeskResult<Ticket> {
        let created_by = AccessResolver::check(caller, Requirement::Authenticated)?;
        let name = input.name.as_deref().map(str::trim).unwrap_or_default().to_string();
        validate_ticket_name(&name)?;

        let ticket = self
            .store
            .insert_ticket(&NewTicket {
                category: input.category,
                priority: input.priority.unwrap_or_default(),
                name,
                created_by,
            })
            .await
            .map_err(store_failure("insert_ticket"))?;

        tracing::info!(
            ticket_id = ticket.id,
            created_by,
            category = %ticket.category,
            "Ticket created"
        );
        Ok(ticket)
    }

    pub async fn get(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<Ticket> {
        AccessResolver::check(caller, Requirement::Authenticated)?;
        let ticket = self.find(id).await?;
        AccessResolver::check_ticket_access(caller, ticket.created_by)?;
        Ok(ticket)
    }

    pub async fn list(&self, caller: &ResolvedIdentity, scope: TicketScope) -> DeskResult<Vec<Ticket>> {
        let scope = Self::scope_for(caller, scope)?;
        self.store
            .list_tickets(scope)
            .await
            .map_err(store_failure("list_tickets"))
    }

    pub async fn update_status(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        status: TicketStatus,
    ) -> DeskResult<Ticket> {
        self.patch(
            caller,
            id,
            UpdateTicket {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_priority(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        priority: TicketPriority,
    ) -> DeskResult<Ticket> {
        self.patch(
            caller,
            id,
            UpdateTicket {
                priority: Some(priority),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_category(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        category: TicketCategory,
    ) -> DeskResult<Ticket> {
        self.patch(
            caller,
            id,
            UpdateTicket {
                category: Some(category),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn update_title(
        &self,
        caller: &ResolvedIdentity,
        id: DbId,
        title: &str,
    ) -> DeskResult<Ticket> {
        let title = title.trim();
        validate_ticket_name(title)?;
        self.patch(
            caller,
            id,
            UpdateTicket {
                name: Some(title.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Move `updated_at` forward so the ticket sorts first.
    pub async fn touch(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<Ticket> {
        let ticket = self.get(caller, id).await?;
        self.store
            .touch_ticket(ticket.id)
            .await
            .map_err(store_failure("touch_ticket"))
    }

    /// Delete a ticket and its conversation.
    ///
    /// Messages go first. If removing them fails the ticket row is left in
    /// place and the error is returned.
    pub async fn delete(&self, caller: &ResolvedIdentity, id: DbId) -> DeskResult<()> {
        AccessResolver::check(caller, Requirement::Manager)?;
        let ticket = self.find(id).await?;

        let removed = self
            .store
            .delete_messages_for_ticket(ticket.id)
            .await
            .map_err(store_failure("delete_messages_for_ticket"))?;

        let deleted = self
            .store
            .delete_ticket(ticket.id)
            .await
            .map_err(store_failure("delete_ticket"))?;
        if !deleted {
            return Err(DeskError::not_found("ticket", id));
        }

        tracing::info!(ticket_id = id, messages = removed, "Ticket deleted");
        Ok(())
    }

    pub(crate) async fn find(&self, id: DbId) -> DeskResult<Ticket> {
        self.store
            .find_ticket(id)
            .await
            .map_err(store_failure("find_ticket"))?
            .ok_or_else(|| DeskError::not_found("ticket", id))
    }

    async fn patch(&self, caller: &ResolvedIdentity, id: DbId, patch: UpdateTicket) -> DeskResult<Ticket> {
        AccessResolver::check(caller, Requirement::Staff)?;
        let ticket = self
            .store
            .update_ticket(id, &patch)
            .await
            .map_err(store_failure("update_ticket"))?;
        tracing::info!(ticket_id = id, status = %ticket.status, "Ticket updated");
        Ok(ticket)
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// A live, sorted list of tickets for one session.
///
/// Mutations are applied locally first and confirmed with the store's row;
/// a failed write is rolled back and its message kept in [`error`](Self::error).
pub struct TicketDesk {
    session: SessionContext,
    service: TicketService,
    assignment: AssignmentService,
    scope: TicketScope,
    tickets: SyncedCollection<Ticket>,
    subscription: Option<Subscription>,
    error: Option<String>,
}

fn collection_for(scope: TicketScope) -> SyncedCollection<Ticket> {
    match scope {
        TicketScope::All => SyncedCollection::new(by_updated_desc),
        TicketScope::CreatedBy(user_id) => {
            SyncedCollection::new(by_updated_desc).with_filter(move |t: &Ticket| t.created_by == user_id)
        }
        TicketScope::AssignedTo(user_id) => SyncedCollection::new(by_updated_desc)
            .with_filter(move |t: &Ticket| t.assigned_to == Some(user_id)),
        TicketScope::Unassigned => SyncedCollection::new(ticket_by_created_asc)
            .with_filter(|t: &Ticket| t.assigned_to.is_none()),
    }
}

impl TicketDesk {
    /// Subscribe to ticket changes, then load the scope the caller may see.
    pub async fn open(session: SessionContext, requested: TicketScope) -> DeskResult<Self> {
        let identity = session.identity().await?;
        let scope = TicketService::scope_for(&identity, requested)?;
        let store = session.store();
        let subscription = session.bus().subscribe(Topic::table(Table::Tickets));

        let mut desk = Self {
            service: TicketService::new(Arc::clone(&store)),
            assignment: AssignmentService::new(store),
            session,
            scope,
            tickets: collection_for(scope),
            subscription: Some(subscription),
            error: None,
        };
        desk.refresh().await?;
        Ok(desk)
    }

    pub fn scope(&self) -> TicketScope {
        self.scope
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.tickets.to_vec()
    }

    pub fn get(&self, id: DbId) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    pub fn collection(&self) -> &SyncedCollection<Ticket> {
        &self.tickets
    }

    /// Message of the last failed operation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Reload from the store.
    pub async fn refresh(&mut self) -> DeskResult<()> {
        let identity = self.identity().await?;
        match self.service.list(&identity, self.scope).await {
            Ok(rows) => {
                self.tickets.replace_all(rows);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn create(&mut self, input: CreateTicket) -> DeskResult<Ticket> {
        let identity = self.identity().await?;
        match self.service.create(&identity, input).await {
            Ok(ticket) => {
                if self.tickets.admits(&ticket) {
                    self.tickets.apply_local(ticket.clone());
                }
                Ok(ticket)
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn update_status(&mut self, id: DbId, status: TicketStatus) -> DeskResult<Ticket> {
        let identity = self.identity().await?;
        let staged = self.stage(id, |t| {
            t.status = status;
            t.resolved = status.is_resolved();
        });
        let result = self.service.update_status(&identity, id, status).await;
        self.settle(id, staged, result)
    }

    pub async fn update_priority(&mut self, id: DbId, priority: TicketPriority) -> DeskResult<Ticket> {
        let identity = self.identity().await?;
        let staged = self.stage(id, |t| t.priority = priority);
        let result = self.service.update_priority(&identity, id, priority).await;
        self.settle(id, staged, result)
    }

    pub async fn update_category(&mut self, id: DbId, category: TicketCategory) -> DeskResult<Ticket> {
        let identity = self.identity().await?;
        let staged = self.stage(id, |t| t.category = category);
        let result = self.service.update_category(&identity, id, category).await;
        self.settle(id, staged, result)
    }

    pub async fn update_title(&mut self, id: DbId, title: &str) -> DeskResult<Ticket> {
        let identity = self.identity().await?;
        let trimmed = title.trim().to_string();
        let staged = self.stage(id, |t| t.name = trimmed);
        let result = self.service.update_title(&identity, id, title).await;
        self.settle(id, staged, result)
    }

    pub async fn touch_timestamp(&mut self, id: DbId) -> DeskResult<Ticket> {
        let identity = self.identity().await?;
        let staged = self.stage(id, |t| t.updated_at = next_touch(t.updated_at, Utc::now()));
        let result = self.service.touch(&identity, id).await;
        self.settle(id, staged, result)
    }

    /// Assign a ticket. Returns the updated ticket and the posted notice.
    pub async fn assign(&mut self, id: DbId, assignee_id: DbId) -> DeskResult<(Ticket, Message)> {
        let identity = self.identity().await?;
        let staged = self.stage(id, |t| {
            t.assigned_to = Some(assignee_id);
            t.status = status_after_assignment(t.status);
        });
        match self.assignment.assign(&identity, id, assignee_id).await {
            Ok((ticket, notice)) => {
                self.tickets.confirm(ticket.clone());
                Ok((ticket, notice))
            }
            Err(e) => {
                self.rollback(id, staged);
                self.fail(e)
            }
        }
    }

    /// Manager form save: only changed fields are written.
    pub async fn save_changes(&mut self, id: DbId, changes: TicketChanges) -> DeskResult<Ticket> {
        let identity = self.identity().await?;
        let staged = self.stage(id, |t| {
            if let Some(name) = &changes.name {
                t.name = name.trim().to_string();
            }
            if let Some(category) = changes.category {
                t.category = category;
            }
            if let Some(priority) = changes.priority {
                t.priority = priority;
            }
            if let Some(assignee) = changes.assigned_to {
                if t.assigned_to != Some(assignee) {
                    t.assigned_to = Some(assignee);
                    t.status = status_after_assignment(t.status);
                }
            }
            t.updated_at = next_touch(t.updated_at, Utc::now());
        });
        let result = self.assignment.save_changes(&identity, id, &changes).await;
        self.settle(id, staged, result)
    }

    pub async fn delete(&mut self, id: DbId) -> DeskResult<()> {
        let identity = self.identity().await?;
        let removed = self.tickets.remove_local(id);
        match self.service.delete(&identity, id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if removed.is_some() {
                    self.tickets.revert(id, removed);
                }
                self.fail(e)
            }
        }
    }

    /// Apply every buffered change event. Returns how many changed the list.
    pub async fn drain_changes(&mut self) -> DeskResult<usize> {
        let mut changed = 0;
        while let Some(item) = feed::poll(&mut self.subscription) {
            match item {
                Feed::Event(event) => {
                    if self.tickets.apply_event(&event) != Applied::Ignored {
                        changed += 1;
                    }
                }
                Feed::Lagged => {
                    self.refresh().await?;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Wait for the next change that affects the list.
    ///
    /// Returns `None` once the session has ended; the subscription is
    /// released then.
    pub async fn next_change(&mut self) -> Option<Applied> {
        loop {
            match feed::next(&self.session, &mut self.subscription).await? {
                Feed::Event(event) => match self.tickets.apply_event(&event) {
                    Applied::Ignored => continue,
                    applied => return Some(applied),
                },
                Feed::Lagged => {
                    if let Err(e) = self.refresh().await {
                        tracing::error!(error = %e, "Ticket reload after lag failed");
                    }
                    return Some(Applied::Reloaded);
                }
            }
        }
    }

    /// Release the change subscription.
    pub fn close(&mut self) {
        self.subscription.take();
    }

    async fn identity(&mut self) -> DeskResult<ResolvedIdentity> {
        match self.session.identity().await {
            Ok(identity) => Ok(identity),
            Err(e) => self.fail(e),
        }
    }

    /// Apply `edit` to the local copy ahead of the write. `None` when the
    /// ticket is not in this list.
    fn stage(&mut self, id: DbId, edit: impl FnOnce(&mut Ticket)) -> Option<Option<Ticket>> {
        let mut row = self.tickets.get(id)?.clone();
        edit(&mut row);
        Some(self.tickets.apply_local(row))
    }

    fn settle(
        &mut self,
        id: DbId,
        staged: Option<Option<Ticket>>,
        result: DeskResult<Ticket>,
    ) -> DeskResult<Ticket> {
        match result {
            Ok(ticket) => {
                self.tickets.confirm(ticket.clone());
                Ok(ticket)
            }
            Err(e) => {
                self.rollback(id, staged);
                self.fail(e)
            }
        }
    }

    fn rollback(&mut self, id: DbId, staged: Option<Option<Ticket>>) {
        if let Some(previous) = staged {
            self.tickets.revert(id, previous);
        }
    }

    fn fail<T>(&mut self, err: DeskError) -> DeskResult<T> {
        tracing::error!(error = %err, "Ticket operation failed");
        self.error = Some(err.to_string());
        Err(err)
    }
}
