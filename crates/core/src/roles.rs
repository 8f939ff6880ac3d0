//! Roles and capabilities.
//!
//! An authenticated user resolves to exactly one [`ResolvedIdentity`]:
//! employees are looked up first, then customers. Everything else about
//! authorization is derived from that variant.

use crate::message::SenderType;
use crate::types::DbId;

crate::define_text_enum! {
    /// Employee permission level, highest first.
    Permission ("permission") {
        SuperAdmin = "super_admin",
        Admin = "admin",
        Manager = "manager",
        Agent = "agent",
        Employee = "employee",
    }
}

/// Role name reported for customers.
pub const ROLE_CUSTOMER: &str = "customer";

impl Permission {
    /// Managers and above may assign tickets and review articles.
    pub fn can_manage(self) -> bool {
        matches!(
            self,
            Permission::SuperAdmin | Permission::Admin | Permission::Manager
        )
    }
}

/// Outcome of role resolution for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedIdentity {
    Employee {
        user_id: DbId,
        department: String,
        permissions: Permission,
    },
    Customer {
        user_id: DbId,
    },
    /// Authenticated, but neither an employee nor a customer.
    Unresolved,
}

impl ResolvedIdentity {
    /// Resolve from the two roster lookups. The employee record wins when a
    /// user appears in both.
    pub fn resolve(
        user_id: DbId,
        employee: Option<(String, Permission)>,
        is_customer: bool,
    ) -> Self {
        match employee {
            Some((department, permissions)) => ResolvedIdentity::Employee {
                user_id,
                department,
                permissions,
            },
            None if is_customer => ResolvedIdentity::Customer { user_id },
            None => ResolvedIdentity::Unresolved,
        }
    }

    pub fn user_id(&self) -> Option<DbId> {
        match self {
            ResolvedIdentity::Employee { user_id, .. } | ResolvedIdentity::Customer { user_id } => {
                Some(*user_id)
            }
            ResolvedIdentity::Unresolved => None,
        }
    }

    /// Role name: the permission level for employees, `customer` otherwise.
    pub fn role_name(&self) -> Option<&'static str> {
        match self {
            ResolvedIdentity::Employee { permissions, .. } => Some(permissions.as_str()),
            ResolvedIdentity::Customer { .. } => Some(ROLE_CUSTOMER),
            ResolvedIdentity::Unresolved => None,
        }
    }

    /// Only employees carry a department.
    pub fn department(&self) -> Option<&str> {
        match self {
            ResolvedIdentity::Employee { department, .. } => Some(department),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, ResolvedIdentity::Employee { .. })
    }

    pub fn is_customer(&self) -> bool {
        matches!(self, ResolvedIdentity::Customer { .. })
    }

    /// May assign tickets, delete them and review articles.
    pub fn can_manage(&self) -> bool {
        match self {
            ResolvedIdentity::Employee { permissions, .. } => permissions.can_manage(),
            _ => false,
        }
    }

    /// Sender classification for messages written by this identity.
    /// Anyone who is not on the employee roster is treated as a customer.
    pub fn sender_type(&self) -> SenderType {
        if self.is_staff() {
            SenderType::Employee
        } else {
            SenderType::Customer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_wins_over_customer() {
        let id = ResolvedIdentity::resolve(7, Some(("billing".into(), Permission::Agent)), true);
        assert!(id.is_staff());
        assert_eq!(id.department(), Some("billing"));
        assert_eq!(id.role_name(), Some("agent"));
    }

    #[test]
    fn test_customer_has_no_department() {
        let id = ResolvedIdentity::resolve(9, None, true);
        assert_eq!(id, ResolvedIdentity::Customer { user_id: 9 });
        assert_eq!(id.department(), None);
        assert_eq!(id.role_name(), Some(ROLE_CUSTOMER));
        assert_eq!(id.sender_type(), SenderType::Customer);
    }

    #[test]
    fn test_unknown_user_is_unresolved() {
        let id = ResolvedIdentity::resolve(3, None, false);
        assert_eq!(id, ResolvedIdentity::Unresolved);
        assert_eq!(id.user_id(), None);
        assert!(!id.can_manage());
    }

    #[test]
    fn test_manage_capability_by_permission() {
        for (perm, expected) in [
            (Permission::SuperAdmin, true),
            (Permission::Admin, true),
            (Permission::Manager, true),
            (Permission::Agent, false),
            (Permission::Employee, false),
        ] {
            let id = ResolvedIdentity::resolve(1, Some(("support".into(), perm)), false);
            assert_eq!(id.can_manage(), expected, "{perm}");
        }
    }

    #[test]
    fn test_identity_serializes_with_kind_tag() {
        let id = ResolvedIdentity::resolve(4, Some(("technical".into(), Permission::Manager)), false);
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json["kind"], "employee");
        assert_eq!(json["permissions"], "manager");
    }
}
