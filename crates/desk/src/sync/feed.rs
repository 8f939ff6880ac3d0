//! Pulling change events for a view.

use helpdesk_events::{ChangeEvent, RecvError, Subscription};

use crate::session::SessionContext;

/// One item from a view's change stream.
pub(crate) enum Feed {
    Event(ChangeEvent),
    /// Events were dropped; the view must reload.
    Lagged,
}

/// Wait for the next event.
///
/// Returns `None` once the session closes or the bus shuts down; the
/// subscription in `slot` is released at that point.
pub(crate) async fn next(session: &SessionContext, slot: &mut Option<Subscription>) -> Option<Feed> {
    let subscription = slot.as_mut()?;
    let received = tokio::select! {
        _ = session.closed() => None,
        received = subscription.recv() => Some(received),
    };
    match received {
        Some(Ok(event)) => Some(Feed::Event(event)),
        Some(Err(RecvError::Lagged(_))) => Some(Feed::Lagged),
        Some(Err(RecvError::Closed)) | None => {
            slot.take();
            None
        }
    }
}

/// Take a buffered event without waiting.
pub(crate) fn poll(slot: &mut Option<Subscription>) -> Option<Feed> {
    let subscription = slot.as_mut()?;
    match subscription.try_recv() {
        Ok(Some(event)) => Some(Feed::Event(event)),
        Ok(None) => None,
        Err(RecvError::Lagged(_)) => Some(Feed::Lagged),
        Err(RecvError::Closed) => {
            slot.take();
            None
        }
    }
}
