//! Message store adapter and the live conversation of one ticket.

use std::sync::Arc;

use helpdesk_core::message::prepare_message_text;
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::types::DbId;
use helpdesk_db::models::message::{Message, NewMessage};
use helpdesk_db::models::ticket::Ticket;
use helpdesk_db::Store;
use helpdesk_events::{Subscription, Table, Topic};

use crate::access::{AccessResolver, Requirement};
use crate::error::{store_failure, DeskError, DeskResult};
use crate::session::SessionContext;
use crate::sync::feed::{self, Feed};
use crate::sync::{by_created_asc, Applied, SyncedCollection};

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn Store>,
}

impl MessageService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Post a message as the caller.
    ///
    /// Blank text and unknown tickets are a no-op (`Ok(None)`). The sender
    /// type comes from the caller's role. The owning ticket is touched after
    /// the insert; a failed touch is logged and the message still returned.
    pub async fn send(
        &self,
        caller: &ResolvedIdentity,
        ticket_id: DbId,
        text: &str,
    ) -> DeskResult<Option<Message>> {
        self.post(caller, ticket_id, text, false).await
    }

    /// Post a system message. Staff only.
    pub async fn send_system_message(
        &self,
        caller: &ResolvedIdentity,
        ticket_id: DbId,
        text: &str,
    ) -> DeskResult<Option<Message>> {
        AccessResolver::check(caller, Requirement::Staff)?;
        self.post(caller, ticket_id, text, true).await
    }

    /// The ticket's conversation, oldest first.
    pub async fn list(&self, caller: &ResolvedIdentity, ticket_id: DbId) -> DeskResult<Vec<Message>> {
        AccessResolver::check(caller, Requirement::Authenticated)?;
        let ticket = self
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| DeskError::not_found("ticket", ticket_id))?;
        AccessResolver::check_ticket_access(caller, ticket.created_by)?;
        self.store
            .list_messages(ticket_id)
            .await
            .map_err(store_failure("list_messages"))
    }

    async fn post(
        &self,
        caller: &ResolvedIdentity,
        ticket_id: DbId,
        text: &str,
        is_system_message: bool,
    ) -> DeskResult<Option<Message>> {
        let created_by = AccessResolver::check(caller, Requirement::Authenticated)?;
        let Some(text) = prepare_message_text(text)? else {
            return Ok(None);
        };
        let Some(ticket) = self.find_ticket(ticket_id).await? else {
            tracing::debug!(ticket_id, "Message dropped for missing ticket");
            return Ok(None);
        };
        AccessResolver::check_ticket_access(caller, ticket.created_by)?;

        let message = self
            .store
            .insert_message(&NewMessage {
                ticket_id,
                message: text,
                created_by,
                sender_type: caller.sender_type(),
                is_system_message,
            })
            .await
            .map_err(store_failure("insert_message"))?;

        if let Err(e) = self.store.touch_ticket(ticket_id).await {
            tracing::error!(error = %e, ticket_id, message_id = message.id, "Failed to touch ticket after message");
        }

        tracing::debug!(
            ticket_id,
            message_id = message.id,
            sender_type = %message.sender_type,
            is_system_message,
            "Message sent"
        );
        Ok(Some(message))
    }

    async fn find_ticket(&self, id: DbId) -> DeskResult<Option<Ticket>> {
        self.store.find_ticket(id).await.map_err(store_failure("find_ticket"))
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Messages of the active ticket, kept sorted and in sync.
///
/// Switching tickets releases the previous subscription before the next one
/// is taken.
pub struct MessageThread {
    session: SessionContext,
    service: MessageService,
    ticket_id: Option<DbId>,
    messages: SyncedCollection<Message>,
    subscription: Option<Subscription>,
    error: Option<String>,
}

impl MessageThread {
    pub fn new(session: SessionContext) -> Self {
        Self {
            service: MessageService::new(session.store()),
            session,
            ticket_id: None,
            messages: SyncedCollection::new(by_created_asc),
            subscription: None,
            error: None,
        }
    }

    pub fn ticket_id(&self) -> Option<DbId> {
        self.ticket_id
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.to_vec()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Make `ticket_id` the active conversation.
    pub async fn switch_to(&mut self, ticket_id: DbId) -> DeskResult<()> {
        self.leave();
        self.ticket_id = Some(ticket_id);
        self.subscription = Some(
            self.session
                .bus()
                .subscribe(Topic::scoped(Table::Messages, ticket_id)),
        );
        self.reload().await
    }

    /// Drop the active conversation and its subscription.
    pub fn leave(&mut self) {
        if let Some(previous) = self.subscription.take() {
            previous.unsubscribe();
        }
        self.ticket_id = None;
        self.messages.clear();
    }

    pub async fn reload(&mut self) -> DeskResult<()> {
        let Some(ticket_id) = self.ticket_id else {
            return Ok(());
        };
        let identity = self.identity().await?;
        match self.service.list(&identity, ticket_id).await {
            Ok(rows) => {
                self.messages.replace_all(rows);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Send to the active ticket. `Ok(None)` when there is no active ticket
    /// or the text is blank.
    pub async fn send(&mut self, text: &str) -> DeskResult<Option<Message>> {
        self.post(text, false).await
    }

    pub async fn send_system_message(&mut self, text: &str) -> DeskResult<Option<Message>> {
        self.post(text, true).await
    }

    pub async fn drain_changes(&mut self) -> DeskResult<usize> {
        let mut changed = 0;
        while let Some(item) = feed::poll(&mut self.subscription) {
            match item {
                Feed::Event(event) => {
                    if self.messages.apply_event(&event) != Applied::Ignored {
                        changed += 1;
                    }
                }
                Feed::Lagged => {
                    self.reload().await?;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Wait for the next change to the conversation. `None` once the session
    /// has ended or no ticket is active.
    pub async fn next_change(&mut self) -> Option<Applied> {
        loop {
            match feed::next(&self.session, &mut self.subscription).await? {
                Feed::Event(event) => match self.messages.apply_event(&event) {
                    Applied::Ignored => continue,
                    applied => return Some(applied),
                },
                Feed::Lagged => {
                    if let Err(e) = self.reload().await {
                        tracing::error!(error = %e, "Message reload after lag failed");
                    }
                    return Some(Applied::Reloaded);
                }
            }
        }
    }

    async fn post(&mut self, text: &str, system: bool) -> DeskResult<Option<Message>> {
        let Some(ticket_id) = self.ticket_id else {
            return Ok(None);
        };
        let identity = self.identity().await?;
        let result = if system {
            self.service.send_system_message(&identity, ticket_id, text).await
        } else {
            self.service.send(&identity, ticket_id, text).await
        };
        match result {
            Ok(Some(message)) => {
                self.messages.apply_local(message.clone());
                Ok(Some(message))
            }
            Ok(None) => Ok(None),
            Err(e) => self.fail(e),
        }
    }

    async fn identity(&mut self) -> DeskResult<ResolvedIdentity> {
        match self.session.identity().await {
            Ok(identity) => Ok(identity),
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&mut self, err: DeskError) -> DeskResult<T> {
        tracing::error!(error = %err, ticket_id = ?self.ticket_id, "Message operation failed");
        self.error = Some(err.to_string());
        Err(err)
    }
}
