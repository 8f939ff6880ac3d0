//! Session context.
//!
//! A [`SessionContext`] is built once the identity provider reports a signed
//! in user and is shared (cheaply cloned) by every view of that user. Signing
//! out, or the provider switching to another user, cancels the context; views
//! observe the cancellation and release their subscriptions.

use std::sync::Arc;

use async_trait::async_trait;
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::types::DbId;
use helpdesk_db::Store;
use helpdesk_events::ChangeBus;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::access::{AccessResolver, Requirement};
use crate::error::{DeskError, DeskResult};

/// What the identity provider knows about the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: DbId,
    pub email_verified: bool,
}

/// External identity provider. Only the current session and change
/// notifications are needed; the authentication protocol stays outside.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_session(&self) -> DeskResult<Option<Session>>;

    /// Notified whenever the session changes (sign in, sign out, refresh).
    fn watch(&self) -> watch::Receiver<Option<Session>>;

    async fn sign_out(&self) -> DeskResult<()>;
}

/// In-process identity provider holding the session in a watch channel.
pub struct SessionCell {
    sender: watch::Sender<Option<Session>>,
}

impl SessionCell {
    pub fn new(initial: Option<Session>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn signed_in(user_id: DbId) -> Self {
        Self::new(Some(Session {
            user_id,
            email_verified: true,
        }))
    }

    pub fn sign_in(&self, session: Session) {
        self.sender.send_replace(Some(session));
    }
}

#[async_trait]
impl IdentityProvider for SessionCell {
    async fn current_session(&self) -> DeskResult<Option<Session>> {
        Ok(*self.sender.borrow())
    }

    fn watch(&self) -> watch::Receiver<Option<Session>> {
        self.sender.subscribe()
    }

    async fn sign_out(&self) -> DeskResult<()> {
        self.sender.send_replace(None);
        Ok(())
    }
}

struct SessionInner {
    session: Session,
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn Store>,
    bus: Arc<ChangeBus>,
    closed: CancellationToken,
}

/// Everything a signed-in user's views share.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl SessionContext {
    /// Build the context for the provider's current session.
    ///
    /// Fails with `Unauthorized` when nobody is signed in. Spawns a watcher
    /// that closes the context when the provider's session ends or changes
    /// user, so this must run inside a Tokio runtime.
    pub async fn start(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn Store>,
        bus: Arc<ChangeBus>,
    ) -> DeskResult<Self> {
        let session = provider
            .current_session()
            .await?
            .ok_or_else(|| DeskError::unauthorized("No active session"))?;

        let closed = CancellationToken::new();
        let mut changes = provider.watch();
        let token = closed.clone();
        let user_id = session.user_id;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = changes.changed() => {
                        let same_user = changed.is_ok()
                            && changes.borrow().map(|s| s.user_id) == Some(user_id);
                        if !same_user {
                            tracing::info!(user_id, "Session ended");
                            token.cancel();
                            break;
                        }
                    }
                }
            }
        });

        tracing::info!(user_id, "Session started");
        Ok(Self {
            inner: Arc::new(SessionInner {
                session,
                provider,
                store,
                bus,
                closed,
            }),
        })
    }

    pub fn user_id(&self) -> DbId {
        self.inner.session.user_id
    }

    pub fn email_verified(&self) -> bool {
        self.inner.session.email_verified
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.inner.store)
    }

    pub fn bus(&self) -> Arc<ChangeBus> {
        Arc::clone(&self.inner.bus)
    }

    pub fn is_active(&self) -> bool {
        !self.inner.closed.is_cancelled()
    }

    /// Resolves once the session has been torn down.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await
    }

    /// Resolve the user's role against the current roster.
    pub async fn identity(&self) -> DeskResult<ResolvedIdentity> {
        if !self.is_active() {
            return Err(DeskError::unauthorized("Session has ended"));
        }
        Ok(AccessResolver::resolve(self.inner.store.as_ref(), self.user_id()).await?)
    }

    /// Resolve and check in one step.
    pub async fn require(&self, requirement: Requirement) -> DeskResult<ResolvedIdentity> {
        let identity = self.identity().await?;
        AccessResolver::check(&identity, requirement)?;
        Ok(identity)
    }

    /// Sign out through the provider and tear the context down.
    pub async fn sign_out(&self) -> DeskResult<()> {
        let result = self.inner.provider.sign_out().await;
        self.inner.closed.cancel();
        tracing::info!(user_id = self.user_id(), "Signed out");
        result
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session", &self.inner.session)
            .field("active", &self.is_active())
            .finish()
    }
}
