//! Role-based permission matrix.
//!
//! Permissions are plain `resource:action` strings embedded in the JWT at
//! login time, so a token carries everything needed to gate a route.

use crate::models::UserRole;

/// Permission string constants for compile-time safety.
pub mod consts {
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_CREATE: &str = "orders:create";
    pub const ORDERS_MANAGE: &str = "orders:manage";

    pub const ITEMS_READ: &str = "items:read";
    pub const ITEMS_MANAGE: &str = "items:manage";

    pub const EXPENSES_READ: &str = "expenses:read";
    pub const EXPENSES_MANAGE: &str = "expenses:manage";

    pub const USERS_READ: &str = "users:read";
    pub const USERS_MANAGE: &str = "users:manage";

    pub const STATS_READ: &str = "stats:read";
    pub const ANALYTICS_READ: &str = "analytics:read";

    pub const ORGANIZATIONS_READ: &str = "organizations:read";
    pub const ORGANIZATIONS_MANAGE: &str = "organizations:manage";
    pub const ORGANIZATIONS_DELETE: &str = "organizations:delete";
}

use consts::*;

const OWNER_PERMISSIONS: &[&str] = &[
    ORDERS_READ,
    ORDERS_CREATE,
    ORDERS_MANAGE,
    ITEMS_READ,
    ITEMS_MANAGE,
    EXPENSES_READ,
    EXPENSES_MANAGE,
    USERS_READ,
    USERS_MANAGE,
    STATS_READ,
    ANALYTICS_READ,
    ORGANIZATIONS_READ,
    ORGANIZATIONS_MANAGE,
    ORGANIZATIONS_DELETE,
];

const ADMIN_PERMISSIONS: &[&str] = &[
    ORDERS_READ,
    ORDERS_CREATE,
    ORDERS_MANAGE,
    ITEMS_READ,
    ITEMS_MANAGE,
    EXPENSES_READ,
    EXPENSES_MANAGE,
    USERS_READ,
    USERS_MANAGE,
    STATS_READ,
    ANALYTICS_READ,
    ORGANIZATIONS_READ,
    ORGANIZATIONS_MANAGE,
];

const MANAGER_PERMISSIONS: &[&str] = &[
    ORDERS_READ,
    ORDERS_CREATE,
    ORDERS_MANAGE,
    ITEMS_READ,
    ITEMS_MANAGE,
    EXPENSES_READ,
    EXPENSES_MANAGE,
    USERS_READ,
    STATS_READ,
    ANALYTICS_READ,
    ORGANIZATIONS_READ,
];

const CASHIER_PERMISSIONS: &[&str] = &[
    ORDERS_READ,
    ORDERS_CREATE,
    ITEMS_READ,
    EXPENSES_READ,
    ORGANIZATIONS_READ,
];

/// The permissions granted to a role.
pub fn role_permissions(role: UserRole) -> &'static [&'static str] {
    match role {
        UserRole::Owner => OWNER_PERMISSIONS,
        UserRole::Admin => ADMIN_PERMISSIONS,
        UserRole::Manager => MANAGER_PERMISSIONS,
        UserRole::Cashier => CASHIER_PERMISSIONS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cashiers_can_sell_but_not_manage() {
        let perms = role_permissions(UserRole::Cashier);
        assert!(perms.contains(&ORDERS_CREATE));
        assert!(!perms.contains(&ORDERS_MANAGE));
        assert!(!perms.contains(&ITEMS_MANAGE));
        assert!(!perms.contains(&USERS_READ));
    }

    #[test]
    fn only_owners_may_delete_the_organization() {
        assert!(role_permissions(UserRole::Owner).contains(&ORGANIZATIONS_DELETE));
        for role in [UserRole::Admin, UserRole::Manager, UserRole::Cashier] {
            assert!(!role_permissions(role).contains(&ORGANIZATIONS_DELETE));
        }
    }

    #[test]
    fn managers_cannot_manage_users() {
        let perms = role_permissions(UserRole::Manager);
        assert!(perms.contains(&USERS_READ));
        assert!(!perms.contains(&USERS_MANAGE));
    }
}
