//! Customer "start chat" flow.
//!
//! A customer with tickets resumes the most recently updated one. A customer
//! without tickets picks a category first; the ticket is opened on the first
//! send and that first message is delivered once the ticket exists.

use helpdesk_core::message::prepare_message_text;
use helpdesk_core::ticket::TicketCategory;
use helpdesk_core::types::DbId;
use helpdesk_db::models::message::Message;
use helpdesk_db::models::ticket::{CreateTicket, Ticket, TicketScope};

use crate::access::Requirement;
use crate::error::{DeskError, DeskResult};
use crate::messages::MessageThread;
use crate::session::SessionContext;
use crate::tickets::TicketService;

/// Where the chat stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStage {
    /// No ticket yet and no category chosen.
    ChooseCategory,
    /// Category chosen; the ticket opens with the first message.
    Ready(TicketCategory),
    Active(DbId),
}

pub struct SupportChat {
    session: SessionContext,
    tickets: TicketService,
    thread: MessageThread,
    ticket: Option<Ticket>,
    category: Option<TicketCategory>,
    pending_message: Option<String>,
}

impl SupportChat {
    /// Open the chat for the signed-in user, resuming their latest ticket.
    pub async fn start(session: SessionContext) -> DeskResult<Self> {
        let identity = session.require(Requirement::Authenticated).await?;
        let tickets = TicketService::new(session.store());
        let mut chat = Self {
            thread: MessageThread::new(session.clone()),
            session,
            tickets,
            ticket: None,
            category: None,
            pending_message: None,
        };

        let mine = chat
            .tickets
            .list(&identity, TicketScope::CreatedBy(identity.user_id().unwrap_or_default()))
            .await?;
        if let Some(latest) = mine.into_iter().next() {
            tracing::debug!(ticket_id = latest.id, "Resuming chat");
            chat.thread.switch_to(latest.id).await?;
            chat.ticket = Some(latest);
        }
        Ok(chat)
    }

    pub fn stage(&self) -> ChatStage {
        match (&self.ticket, self.category) {
            (Some(ticket), _) => ChatStage::Active(ticket.id),
            (None, Some(category)) => ChatStage::Ready(category),
            (None, None) => ChatStage::ChooseCategory,
        }
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }

    pub fn thread(&self) -> &MessageThread {
        &self.thread
    }

    pub fn thread_mut(&mut self) -> &mut MessageThread {
        &mut self.thread
    }

    /// Choose the category of the ticket to open. Ignored once a ticket exists.
    pub fn select_category(&mut self, category: TicketCategory) {
        if self.ticket.is_none() {
            self.category = Some(category);
        }
    }

    /// The first message, held until it has been posted to the new ticket.
    pub fn pending_message(&self) -> Option<&str> {
        self.pending_message.as_deref()
    }

    /// Send a message, opening the ticket first if needed.
    ///
    /// Once opened, the ticket is kept even when attaching to it or posting
    /// the first message fails; the next call finishes that work instead of
    /// opening another ticket. A retry with the same text posts it once.
    pub async fn send(&mut self, text: &str) -> DeskResult<Option<Message>> {
        if self.ticket.is_some() {
            if self.pending_message.is_some() {
                let next = prepare_message_text(text)?;
                return self.deliver_pending(next).await;
            }
            return self.thread.send(text).await;
        }

        let Some(category) = self.category else {
            return Err(DeskError::validation("Choose a category before sending"));
        };
        let Some(text) = prepare_message_text(text)? else {
            return Ok(None);
        };

        let identity = self.session.require(Requirement::Authenticated).await?;
        let ticket = self
            .tickets
            .create(
                &identity,
                CreateTicket {
                    category,
                    priority: None,
                    name: None,
                },
            )
            .await?;
        tracing::info!(ticket_id = ticket.id, "Chat ticket opened");
        self.ticket = Some(ticket);
        self.pending_message = Some(text);
        self.deliver_pending(None).await
    }

    /// Attach the thread to the chat's ticket and post the held first
    /// message, then `next` unless it repeats the first one.
    async fn deliver_pending(&mut self, next: Option<String>) -> DeskResult<Option<Message>> {
        let Some(ticket_id) = self.ticket.as_ref().map(|t| t.id) else {
            return Ok(None);
        };
        if self.thread.ticket_id() == Some(ticket_id) {
            self.thread.reload().await?;
        } else {
            self.thread.switch_to(ticket_id).await?;
        }

        let Some(first) = self.pending_message.clone() else {
            return Ok(None);
        };
        let sent = self.thread.send(&first).await?;
        self.pending_message = None;

        match next {
            Some(text) if text != first => self.thread.send(&text).await,
            _ => Ok(sent),
        }
    }

    /// Re-read the active ticket (its `updated_at` moves on every message).
    pub async fn refresh_ticket(&mut self) -> DeskResult<Option<&Ticket>> {
        if let Some(id) = self.ticket.as_ref().map(|t| t.id) {
            let identity = self.session.identity().await?;
            self.ticket = Some(self.tickets.get(&identity, id).await?);
        }
        Ok(self.ticket.as_ref())
    }
}
