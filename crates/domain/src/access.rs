//! Role-based access control guard.
//!
//! Two roles exist: the shop owner, who can do everything, and employees,
//! who handle day-to-day order and customer work but may not manage the
//! vendor list, the product catalogue or user accounts. The guard is
//! consulted before any validation or storage work; a denial short-circuits
//! with zero side effects.

use common::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access to every operation.
    Owner,

    /// Order and customer work only.
    Employee,
}

impl Role {
    /// Returns the stored wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// Parses a stored wire name back into a role.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OWNER" => Some(Role::Owner),
            "EMPLOYEE" => Some(Role::Employee),
            _ => None,
        }
    }

    fn may(&self, action: Action) -> bool {
        match self {
            Role::Owner => true,
            Role::Employee => !matches!(
                action,
                Action::ManageVendors | Action::ManageProductTypes | Action::ManageUsers
            ),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated caller identity, supplied pre-validated by the auth
/// layer. The core never authenticates, only authorizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates an actor from a user id and role.
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Guarded operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateOrder,
    UpdateOrder,
    ChangeStatus,
    AssignVendor,
    MarkDelivered,
    CancelOrder,
    SoftDeleteOrder,
    RestoreOrder,
    ManageCustomers,
    ManageVendors,
    ManageProductTypes,
    ManageUsers,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::CreateOrder => "create orders",
            Action::UpdateOrder => "update orders",
            Action::ChangeStatus => "change order status",
            Action::AssignVendor => "assign vendors",
            Action::MarkDelivered => "mark orders delivered",
            Action::CancelOrder => "cancel orders",
            Action::SoftDeleteOrder => "delete orders",
            Action::RestoreOrder => "restore orders",
            Action::ManageCustomers => "manage customers",
            Action::ManageVendors => "manage vendors",
            Action::ManageProductTypes => "manage product types",
            Action::ManageUsers => "manage users",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Denial returned when a role lacks permission for an action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("role {role} may not {action}")]
pub struct Forbidden {
    pub role: Role,
    pub action: Action,
}

/// Checks whether the actor's role permits the action.
pub fn authorize(actor: &Actor, action: Action) -> Result<(), Forbidden> {
    if actor.role.may(action) {
        Ok(())
    } else {
        Err(Forbidden {
            role: actor.role,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Actor {
        Actor::new(UserId::from_string("U-owner"), Role::Owner)
    }

    fn employee() -> Actor {
        Actor::new(UserId::from_string("U-emp"), Role::Employee)
    }

    #[test]
    fn test_owner_may_do_everything() {
        for action in [
            Action::CreateOrder,
            Action::UpdateOrder,
            Action::ChangeStatus,
            Action::AssignVendor,
            Action::MarkDelivered,
            Action::CancelOrder,
            Action::SoftDeleteOrder,
            Action::RestoreOrder,
            Action::ManageCustomers,
            Action::ManageVendors,
            Action::ManageProductTypes,
            Action::ManageUsers,
        ] {
            assert!(authorize(&owner(), action).is_ok());
        }
    }

    #[test]
    fn test_employee_handles_orders_and_customers() {
        for action in [
            Action::CreateOrder,
            Action::UpdateOrder,
            Action::ChangeStatus,
            Action::AssignVendor,
            Action::MarkDelivered,
            Action::CancelOrder,
            Action::SoftDeleteOrder,
            Action::RestoreOrder,
            Action::ManageCustomers,
        ] {
            assert!(authorize(&employee(), action).is_ok());
        }
    }

    #[test]
    fn test_employee_may_not_manage_master_data() {
        for action in [
            Action::ManageVendors,
            Action::ManageProductTypes,
            Action::ManageUsers,
        ] {
            let denied = authorize(&employee(), action).unwrap_err();
            assert_eq!(denied.role, Role::Employee);
            assert_eq!(denied.action, action);
        }
    }

    #[test]
    fn test_role_wire_names_roundtrip() {
        assert_eq!(Role::parse("OWNER"), Some(Role::Owner));
        assert_eq!(Role::parse("EMPLOYEE"), Some(Role::Employee));
        assert_eq!(Role::parse("ADMIN"), None);
        assert_eq!(Role::Owner.as_str(), "OWNER");
    }
}
