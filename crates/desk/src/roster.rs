//! Live employee roster.
//!
//! Load is derived from the tickets table, so every ticket change may move an
//! employee up or down the ranking. The view refetches the roster once per
//! batch of ticket events rather than patching counts itself.

use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::types::DbId;
use helpdesk_db::models::employee::EmployeeWithLoad;
use helpdesk_events::{Subscription, Table, Topic};

use crate::access::Requirement;
use crate::assignment::AssignmentService;
use crate::error::{DeskError, DeskResult};
use crate::session::SessionContext;
use crate::sync::feed;
use crate::sync::{by_load_asc, Applied, SyncedCollection};

/// Employees with their open-ticket load, least loaded first, kept current
/// as tickets are assigned, closed or deleted.
pub struct RosterView {
    session: SessionContext,
    service: AssignmentService,
    department: Option<String>,
    employees: SyncedCollection<EmployeeWithLoad>,
    subscription: Option<Subscription>,
    error: Option<String>,
}

impl RosterView {
    /// Subscribe to ticket changes, then load the roster (optionally one
    /// department). Staff only.
    pub async fn open(session: SessionContext, department: Option<&str>) -> DeskResult<Self> {
        session.require(Requirement::Staff).await?;
        let subscription = session.bus().subscribe(Topic::table(Table::Tickets));

        let mut view = Self {
            service: AssignmentService::new(session.store()),
            session,
            department: department.map(str::to_string),
            employees: SyncedCollection::new(by_load_asc),
            subscription: Some(subscription),
            error: None,
        };
        view.refresh().await?;
        Ok(view)
    }

    pub fn employees(&self) -> Vec<EmployeeWithLoad> {
        self.employees.to_vec()
    }

    pub fn get(&self, id: DbId) -> Option<&EmployeeWithLoad> {
        self.employees.get(id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub async fn refresh(&mut self) -> DeskResult<()> {
        let identity = self.identity().await?;
        match self.service.roster(&identity, self.department.as_deref()).await {
            Ok(rows) => {
                self.employees.replace_all(rows);
                self.error = None;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Refetch if any ticket changed since the last call. Returns whether a
    /// refetch happened.
    pub async fn drain_changes(&mut self) -> DeskResult<bool> {
        let mut stale = false;
        while feed::poll(&mut self.subscription).is_some() {
            stale = true;
        }
        if stale {
            self.refresh().await?;
        }
        Ok(stale)
    }

    /// Wait for ticket activity and refetch, folding events that arrived
    /// meanwhile into the same refetch.
    ///
    /// Returns `None` once the session has ended.
    pub async fn next_change(&mut self) -> Option<Applied> {
        feed::next(&self.session, &mut self.subscription).await?;
        while feed::poll(&mut self.subscription).is_some() {}
        if let Err(e) = self.refresh().await {
            tracing::error!(error = %e, "Roster refetch failed");
        }
        Some(Applied::Reloaded)
    }

    pub fn close(&mut self) {
        self.subscription.take();
    }

    async fn identity(&mut self) -> DeskResult<ResolvedIdentity> {
        match self.session.identity().await {
            Ok(identity) => Ok(identity),
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&mut self, err: DeskError) -> DeskResult<T> {
        tracing::error!(error = %err, department = ?self.department, "Roster operation failed");
        self.error = Some(err.to_string());
        Err(err)
    }
}

impl std::fmt::Debug for RosterView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterView")
            .field("session", &self.session)
            .field("department", &self.department)
            .field("subscription", &self.subscription)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
