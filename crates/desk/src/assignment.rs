//! Assignment and routing.
//!
//! Recommendations are advisory; nothing is written until a manager confirms
//! an assignee, and the confirmed assignment is one atomic store unit.

use std::sync::Arc;

use helpdesk_core::message::assignment_notice;
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::routing;
use helpdesk_core::ticket::validate_ticket_name;
use helpdesk_core::types::DbId;
use helpdesk_db::models::employee::{EmployeeMetrics, EmployeeWithLoad};
use helpdesk_db::models::message::Message;
use helpdesk_db::models::ticket::{AssignTicket, Ticket, TicketChanges, UpdateTicket};
use helpdesk_db::Store;

use crate::access::{AccessResolver, Requirement};
use crate::error::{store_failure, DeskError, DeskResult};

#[derive(Clone)]
pub struct AssignmentService {
    store: Arc<dyn Store>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Employees with their open-ticket load, least loaded first.
    pub async fn roster(
        &self,
        caller: &ResolvedIdentity,
        department: Option<&str>,
    ) -> DeskResult<Vec<EmployeeWithLoad>> {
        AccessResolver::check(caller, Requirement::Staff)?;
        self.store
            .list_employees_with_load(department.map(str::trim).filter(|d| !d.is_empty()))
            .await
            .map_err(store_failure("list_employees_with_load"))
    }

    /// Workload and output figures for one employee.
    ///
    /// Managers may look at anyone; other staff only at themselves.
    pub async fn metrics(
        &self,
        caller: &ResolvedIdentity,
        employee_id: DbId,
    ) -> DeskResult<EmployeeMetrics> {
        let caller_id = AccessResolver::check(caller, Requirement::Staff)?;
        if caller_id != employee_id && !caller.can_manage() {
            return Err(DeskError::forbidden("Only managers can view other employees' metrics"));
        }
        let employee = self
            .store
            .find_employee(employee_id)
            .await
            .map_err(store_failure("find_employee"))?
            .ok_or_else(|| DeskError::not_found("employee", employee_id))?;
        let counts = self
            .store
            .employee_metric_counts(employee_id)
            .await
            .map_err(store_failure("employee_metric_counts"))?;
        Ok(EmployeeMetrics::from_counts(&employee, counts))
    }

    /// Suggest an assignee for a ticket.
    pub async fn recommend(
        &self,
        caller: &ResolvedIdentity,
        ticket_id: DbId,
    ) -> DeskResult<Option<EmployeeWithLoad>> {
        AccessResolver::check(caller, Requirement::Manager)?;
        let ticket = self.find_ticket(ticket_id).await?;
        let roster = self
            .store
            .list_employees_with_load(None)
            .await
            .map_err(store_failure("list_employees_with_load"))?;

        let choice = routing::recommend(ticket.category, &roster).cloned();
        tracing::debug!(
            ticket_id,
            category = %ticket.category,
            recommended = ?choice.as_ref().map(|e| e.id),
            "Assignee recommended"
        );
        Ok(choice)
    }

    /// Assign `assignee_id` and post the notice, all or nothing.
    pub async fn assign(
        &self,
        caller: &ResolvedIdentity,
        ticket_id: DbId,
        assignee_id: DbId,
    ) -> DeskResult<(Ticket, Message)> {
        let manager_id = AccessResolver::check(caller, Requirement::Manager)?;
        let ticket = self.find_ticket(ticket_id).await?;
        let assignee = self
            .store
            .find_employee(assignee_id)
            .await
            .map_err(store_failure("find_employee"))?
            .ok_or_else(|| DeskError::not_found("employee", assignee_id))?;

        let (ticket, notice) = self
            .store
            .assign_ticket(&AssignTicket {
                ticket_id: ticket.id,
                assignee_id,
                assigned_by: manager_id,
                notice: assignment_notice(&assignee.full_name, &assignee.department),
            })
            .await
            .map_err(store_failure("assign_ticket"))?;

        tracing::info!(
            ticket_id,
            assignee_id,
            assigned_by = manager_id,
            status = %ticket.status,
            "Ticket assigned"
        );
        Ok((ticket, notice))
    }

    /// Save the manager form.
    ///
    /// Writes only the fields that differ from the stored ticket, runs an
    /// assignee change through [`assign`](Self::assign) and touches the
    /// ticket once at the end. Stops at the first failing step.
    pub async fn save_changes(
        &self,
        caller: &ResolvedIdentity,
        ticket_id: DbId,
        changes: &TicketChanges,
    ) -> DeskResult<Ticket> {
        AccessResolver::check(caller, Requirement::Manager)?;
        let current = self.find_ticket(ticket_id).await?;

        let name = changes
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| *n != current.name);
        if let Some(name) = name {
            validate_ticket_name(name)?;
        }
        let patch = UpdateTicket {
            name: name.map(str::to_string),
            category: changes.category.filter(|c| *c != current.category),
            priority: changes.priority.filter(|p| *p != current.priority),
            status: None,
        };

        if patch.name.is_some() || patch.category.is_some() || patch.priority.is_some() {
            self.store
                .update_ticket(ticket_id, &patch)
                .await
                .map_err(store_failure("update_ticket"))?;
        }

        if let Some(assignee) = changes.assigned_to.filter(|a| current.assigned_to != Some(*a)) {
            self.assign(caller, ticket_id, assignee).await?;
        }

        let ticket = self
            .store
            .touch_ticket(ticket_id)
            .await
            .map_err(store_failure("touch_ticket"))?;
        tracing::info!(ticket_id, "Ticket changes saved");
        Ok(ticket)
    }

    async fn find_ticket(&self, id: DbId) -> DeskResult<Ticket> {
        self.store
            .find_ticket(id)
            .await
            .map_err(store_failure("find_ticket"))?
            .ok_or_else(|| DeskError::not_found("ticket", id))
    }
}
