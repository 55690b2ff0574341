//! Domain enums shared across entities, services and handlers.
//!
//! Database columns store these as strings; `strum` handles the
//! round-trip so entity models stay plain `String` fields.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Lifecycle of an order. Only `Pending` orders are mutable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Valid transitions: PENDING -> COMPLETED | CANCELLED, nothing else.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }

    /// Whether an order in this status still holds decremented stock.
    /// Cancelled orders had their stock restored at cancellation time.
    pub fn holds_stock(self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Owner,
    Admin,
    Manager,
    Cashier,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseType {
    Ingredient,
    Packaging,
    Utility,
    Transport,
    Maintenance,
    Rent,
    Salary,
    Other,
}

/// DIRECT costs attach to a specific item; INDIRECT costs are overhead
/// spread across the organization's items by the analytics layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseNature {
    Direct,
    Indirect,
}

impl ExpenseNature {
    /// The nature implied by an expense type when the caller omits it.
    pub fn for_type(expense_type: ExpenseType) -> ExpenseNature {
        match expense_type {
            ExpenseType::Ingredient | ExpenseType::Packaging => ExpenseNature::Direct,
            ExpenseType::Utility
            | ExpenseType::Transport
            | ExpenseType::Maintenance
            | ExpenseType::Rent
            | ExpenseType::Salary
            | ExpenseType::Other => ExpenseNature::Indirect,
        }
    }

    /// Whether `expense_type` is allowed under this nature.
    pub fn permits(self, expense_type: ExpenseType) -> bool {
        ExpenseNature::for_type(expense_type) == self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn order_status_round_trips_through_strings() {
        for status in OrderStatus::iter() {
            let text = status.to_string();
            assert_eq!(OrderStatus::from_str(&text).unwrap(), status);
        }
        assert_eq!(OrderStatus::Pending.to_string(), "PENDING");
        assert!(OrderStatus::from_str("SHIPPED").is_err());
    }

    #[rstest]
    #[case(OrderStatus::Pending, OrderStatus::Completed, true)]
    #[case(OrderStatus::Pending, OrderStatus::Cancelled, true)]
    #[case(OrderStatus::Pending, OrderStatus::Pending, false)]
    #[case(OrderStatus::Completed, OrderStatus::Cancelled, false)]
    #[case(OrderStatus::Cancelled, OrderStatus::Pending, false)]
    #[case(OrderStatus::Completed, OrderStatus::Pending, false)]
    fn order_status_transitions(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn cancelled_orders_do_not_hold_stock() {
        assert!(OrderStatus::Pending.holds_stock());
        assert!(OrderStatus::Completed.holds_stock());
        assert!(!OrderStatus::Cancelled.holds_stock());
    }

    #[rstest]
    #[case(ExpenseType::Ingredient, ExpenseNature::Direct)]
    #[case(ExpenseType::Packaging, ExpenseNature::Direct)]
    #[case(ExpenseType::Utility, ExpenseNature::Indirect)]
    #[case(ExpenseType::Rent, ExpenseNature::Indirect)]
    #[case(ExpenseType::Salary, ExpenseNature::Indirect)]
    #[case(ExpenseType::Other, ExpenseNature::Indirect)]
    fn expense_type_implies_nature(#[case] ty: ExpenseType, #[case] nature: ExpenseNature) {
        assert_eq!(ExpenseNature::for_type(ty), nature);
        assert!(nature.permits(ty));
    }

    #[test]
    fn direct_nature_rejects_overhead_types() {
        assert!(!ExpenseNature::Direct.permits(ExpenseType::Rent));
        assert!(!ExpenseNature::Indirect.permits(ExpenseType::Ingredient));
    }

    #[test]
    fn user_role_parses_wire_format() {
        assert_eq!(UserRole::from_str("CASHIER").unwrap(), UserRole::Cashier);
        assert_eq!(UserRole::Owner.to_string(), "OWNER");
    }
}
