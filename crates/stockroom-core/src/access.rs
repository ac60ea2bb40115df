//! # Access Control
//!
//! Role-based capability checks as a pure function over a static table.
//!
//! ## Capability Table
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────┐
//! │ Action                       │ Allowed roles                │
//! ├──────────────────────────────┼──────────────────────────────┤
//! │ ViewProducts, ViewSuppliers  │ Admin, Inventory, Sales      │
//! │ Create/UpdateProduct         │ Admin, Inventory             │
//! │ AdjustStock                  │ Admin, Inventory             │
//! │ Create/UpdateSupplier        │ Admin, Inventory             │
//! │ LowStockReport               │ Admin, Inventory             │
//! │ RecordSale, ViewSales        │ Admin, Sales                 │
//! │ SalesSummaryReport           │ Admin, Sales                 │
//! │ DeleteProduct/Supplier       │ Admin                        │
//! │ ManageUsers                  │ Admin                        │
//! └──────────────────────────────┴──────────────────────────────┘
//! ```

use std::fmt;
use thiserror::Error;

use crate::types::UserRole;

/// Every guarded operation in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewProducts,
    CreateProduct,
    UpdateProduct,
    AdjustStock,
    DeleteProduct,
    ViewSuppliers,
    CreateSupplier,
    UpdateSupplier,
    DeleteSupplier,
    ManageUsers,
    RecordSale,
    ViewSales,
    LowStockReport,
    SalesSummaryReport,
}

impl Action {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::ViewProducts => "view products",
            Action::CreateProduct => "create products",
            Action::UpdateProduct => "update products",
            Action::AdjustStock => "adjust stock",
            Action::DeleteProduct => "delete products",
            Action::ViewSuppliers => "view suppliers",
            Action::CreateSupplier => "create suppliers",
            Action::UpdateSupplier => "update suppliers",
            Action::DeleteSupplier => "delete suppliers",
            Action::ManageUsers => "manage users",
            Action::RecordSale => "record sales",
            Action::ViewSales => "view sales",
            Action::LowStockReport => "view the low-stock report",
            Action::SalesSummaryReport => "view the sales summary report",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ANY_ROLE: &[UserRole] = &[UserRole::Admin, UserRole::Inventory, UserRole::Sales];
const STOCK_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Inventory];
const SALES_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Sales];
const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// Roles permitted to perform `action`.
pub const fn allowed_roles(action: Action) -> &'static [UserRole] {
    match action {
        Action::ViewProducts | Action::ViewSuppliers => ANY_ROLE,
        Action::CreateProduct
        | Action::UpdateProduct
        | Action::AdjustStock
        | Action::CreateSupplier
        | Action::UpdateSupplier
        | Action::LowStockReport => STOCK_ROLES,
        Action::RecordSale | Action::ViewSales | Action::SalesSummaryReport => SALES_ROLES,
        Action::DeleteProduct | Action::DeleteSupplier | Action::ManageUsers => ADMIN_ONLY,
    }
}

/// Raised when a role lacks the capability for an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Role {role} is not permitted to {action}")]
pub struct AccessDenied {
    pub role: UserRole,
    pub action: Action,
}

impl AccessDenied {
    /// Roles that would have been allowed.
    pub fn allowed(&self) -> &'static [UserRole] {
        allowed_roles(self.action)
    }
}

/// Checks whether `role` may perform `action`.
///
/// ## Example
/// ```rust
/// use stockroom_core::access::{authorize, Action};
/// use stockroom_core::UserRole;
///
/// assert!(authorize(UserRole::Sales, Action::RecordSale).is_ok());
/// assert!(authorize(UserRole::Sales, Action::CreateProduct).is_err());
/// ```
pub fn authorize(role: UserRole, action: Action) -> Result<(), AccessDenied> {
    if allowed_roles(action).contains(&role) {
        Ok(())
    } else {
        Err(AccessDenied { role, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_can_do_everything() {
        let actions = [
            Action::ViewProducts,
            Action::CreateProduct,
            Action::UpdateProduct,
            Action::AdjustStock,
            Action::DeleteProduct,
            Action::ViewSuppliers,
            Action::CreateSupplier,
            Action::UpdateSupplier,
            Action::DeleteSupplier,
            Action::ManageUsers,
            Action::RecordSale,
            Action::ViewSales,
            Action::LowStockReport,
            Action::SalesSummaryReport,
        ];
        for action in actions {
            assert!(authorize(UserRole::Admin, action).is_ok(), "{action}");
        }
    }

    #[test]
    fn test_inventory_cannot_sell_or_delete() {
        assert!(authorize(UserRole::Inventory, Action::CreateProduct).is_ok());
        assert!(authorize(UserRole::Inventory, Action::LowStockReport).is_ok());
        assert!(authorize(UserRole::Inventory, Action::RecordSale).is_err());
        assert!(authorize(UserRole::Inventory, Action::DeleteProduct).is_err());
        assert!(authorize(UserRole::Inventory, Action::ManageUsers).is_err());
    }

    #[test]
    fn test_sales_role() {
        assert!(authorize(UserRole::Sales, Action::RecordSale).is_ok());
        assert!(authorize(UserRole::Sales, Action::SalesSummaryReport).is_ok());
        assert!(authorize(UserRole::Sales, Action::ViewProducts).is_ok());
        assert!(authorize(UserRole::Sales, Action::UpdateSupplier).is_err());
        assert!(authorize(UserRole::Sales, Action::LowStockReport).is_err());
    }

    #[test]
    fn test_denial_message_and_allowed_roles() {
        let denied = authorize(UserRole::Sales, Action::DeleteSupplier).unwrap_err();
        assert_eq!(denied.to_string(), "Role Sales is not permitted to delete suppliers");
        assert_eq!(denied.allowed(), &[UserRole::Admin]);
    }
}
