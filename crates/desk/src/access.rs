//! Role and access resolution.
//!
//! Resolution is never cached: every guarded operation resolves the caller
//! again so permission changes and roster removals take effect immediately.

use helpdesk_core::error::CoreError;
use helpdesk_core::roles::ResolvedIdentity;
use helpdesk_core::types::DbId;
use helpdesk_db::{Store, StoreError};

/// Minimum standing an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any employee or customer.
    Authenticated,
    /// Any employee.
    Staff,
    /// Manager, admin or super admin.
    Manager,
}

pub struct AccessResolver;

impl AccessResolver {
    /// Resolve a user: the employee roster first, then customers.
    pub async fn resolve(store: &dyn Store, user_id: DbId) -> Result<ResolvedIdentity, StoreError> {
        if let Some(employee) = store.find_employee(user_id).await? {
            return Ok(ResolvedIdentity::resolve(
                user_id,
                Some((employee.department, employee.permissions)),
                false,
            ));
        }
        let is_customer = store.find_customer(user_id).await?.is_some();
        let identity = ResolvedIdentity::resolve(user_id, None, is_customer);
        if identity == ResolvedIdentity::Unresolved {
            tracing::warn!(user_id, "User is neither an employee nor a customer");
        }
        Ok(identity)
    }

    /// Check `identity` against `requirement`, returning the user id.
    pub fn check(identity: &ResolvedIdentity, requirement: Requirement) -> Result<DbId, CoreError> {
        let user_id = identity
            .user_id()
            .ok_or_else(|| CoreError::Unauthorized("No employee or customer record".into()))?;
        let allowed = match requirement {
            Requirement::Authenticated => true,
            Requirement::Staff => identity.is_staff(),
            Requirement::Manager => identity.can_manage(),
        };
        if !allowed {
            return Err(CoreError::Forbidden(
                match requirement {
                    Requirement::Staff => "Employee role required",
                    _ => "Manager role required",
                }
                .into(),
            ));
        }
        Ok(user_id)
    }

    /// Customers may only touch tickets they opened.
    pub fn check_ticket_access(
        identity: &ResolvedIdentity,
        ticket_owner: DbId,
    ) -> Result<DbId, CoreError> {
        let user_id = Self::check(identity, Requirement::Authenticated)?;
        if identity.is_staff() || user_id == ticket_owner {
            Ok(user_id)
        } else {
            Err(CoreError::Forbidden("Not your ticket".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use helpdesk_core::roles::Permission;

    fn employee(permissions: Permission) -> ResolvedIdentity {
        ResolvedIdentity::resolve(1, Some(("technical".into(), permissions)), false)
    }

    #[test]
    fn test_unresolved_is_unauthorized() {
        assert_matches!(
            AccessResolver::check(&ResolvedIdentity::Unresolved, Requirement::Authenticated),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn test_customer_is_not_staff() {
        let customer = ResolvedIdentity::Customer { user_id: 5 };
        assert_eq!(AccessResolver::check(&customer, Requirement::Authenticated).unwrap(), 5);
        assert_matches!(
            AccessResolver::check(&customer, Requirement::Staff),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn test_agent_cannot_manage() {
        assert!(AccessResolver::check(&employee(Permission::Agent), Requirement::Staff).is_ok());
        assert_matches!(
            AccessResolver::check(&employee(Permission::Agent), Requirement::Manager),
            Err(CoreError::Forbidden(_))
        );
        assert!(AccessResolver::check(&employee(Permission::Admin), Requirement::Manager).is_ok());
    }

    #[test]
    fn test_customers_limited_to_own_tickets() {
        let customer = ResolvedIdentity::Customer { user_id: 5 };
        assert!(AccessResolver::check_ticket_access(&customer, 5).is_ok());
        assert!(AccessResolver::check_ticket_access(&customer, 6).is_err());
        assert!(AccessResolver::check_ticket_access(&employee(Permission::Agent), 6).is_ok());
    }
}
