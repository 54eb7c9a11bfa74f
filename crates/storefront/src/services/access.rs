//! Who may see or pay for an order.
//!
//! Roles are passed in already re-read from the database; nothing here
//! trusts a role cached in the session.

use anna_paris_core::{UserId, UserRole};

use crate::models::Order;
use crate::models::user::GUEST_EMAIL;

/// The caller of an order endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User { id: UserId, role: UserRole },
}

impl Caller {
    /// Whether the caller is a signed-in admin.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::User { role, .. } if role.is_admin())
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Not signed in where a session is required.
    Unauthenticated,
    Forbidden,
}

/// Order detail: the owner or an admin.
#[must_use]
pub fn can_view_order(caller: Caller, order: &Order) -> Access {
    match caller {
        Caller::Anonymous => Access::Unauthenticated,
        Caller::User { id, role } if id == order.user_id || role.is_admin() => Access::Granted,
        Caller::User { .. } => Access::Forbidden,
    }
}

/// Opening a payment session: the owner, or an anonymous caller paying for a
/// guest order.
#[must_use]
pub fn can_pay_for_order(caller: Caller, order: &Order) -> Access {
    match caller {
        Caller::Anonymous if order.customer_email == GUEST_EMAIL => Access::Granted,
        Caller::Anonymous => Access::Forbidden,
        Caller::User { id, .. } if id == order.user_id => Access::Granted,
        Caller::User { .. } => Access::Forbidden,
    }
}

/// Whose orders a list request returns.
///
/// Only admins may name another user; everyone else gets their own orders.
///
/// # Errors
///
/// Returns `Access::Forbidden` if a non-admin asks for another user's orders.
pub fn orders_list_owner(
    caller_id: UserId,
    caller_role: UserRole,
    requested: Option<UserId>,
) -> Result<UserId, Access> {
    match requested {
        None => Ok(caller_id),
        Some(id) if id == caller_id => Ok(caller_id),
        Some(id) if caller_role.is_admin() => Ok(id),
        Some(_) => Err(Access::Forbidden),
    }
}
