//! Order and table aggregates consumed by the print core
//!
//! These arrive fully resolved from the order subsystem: items populated,
//! monetary totals computed. Cancelled rows may still be present and are
//! filtered here, so applying the filter again is a no-op.

use crate::validation::{ValidationError, ValidationResult};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// One product line of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub product_name: String,
    /// Menu category (e.g. "PETISCOS"), used to route kitchen tickets
    #[serde(default)]
    pub category: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            category: None,
            unit_price,
            quantity,
            observations: None,
            cancelled: false,
        }
    }

    /// unit_price * quantity, `None` when the product does not fit a Decimal
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    fn validate(&self, index: usize) -> ValidationResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::missing(format!("items[{}].product_id", index)));
        }
        if self.product_name.trim().is_empty() {
            return Err(ValidationError::missing(format!(
                "items[{}].product_name",
                index
            )));
        }
        if self.quantity == 0 {
            return Err(ValidationError::invalid(
                format!("items[{}].quantity", index),
                "must be at least 1",
            ));
        }
        if self.unit_price.is_sign_negative() {
            return Err(ValidationError::invalid(
                format!("items[{}].unit_price", index),
                "must not be negative",
            ));
        }
        if self.line_total().is_none() {
            return Err(out_of_range(format!("items[{}]", index)));
        }
        Ok(())
    }
}

/// A single order placed for a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAggregate {
    #[serde(default)]
    pub id: String,
    pub table_number: u32,
    pub waiter_name: String,
    /// Unix milliseconds
    pub created_at: i64,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub service_charge: Decimal,
    pub final_total: Decimal,
    #[serde(default)]
    pub cancelled: bool,
}

impl OrderAggregate {
    /// Items that are printed and counted
    pub fn active_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|item| !item.cancelled)
    }

    /// Sum of active line totals, `None` on overflow
    pub fn items_total(&self) -> Option<Decimal> {
        checked_sum(self.active_items().map(LineItem::line_total))
    }

    /// Copy of this order without cancelled items
    pub fn without_cancelled_items(&self) -> Self {
        let mut order = self.clone();
        order.items.retain(|item| !item.cancelled);
        order
    }

    /// Check that every field needed for printing is present and consistent
    ///
    /// `final_total` must equal `subtotal + service_charge` at cent precision.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.table_number == 0 {
            return Err(ValidationError::missing("table_number"));
        }
        if self.waiter_name.trim().is_empty() {
            return Err(ValidationError::missing("waiter_name"));
        }
        self.validate_items()?;
        for (field, value) in [
            ("subtotal", self.subtotal),
            ("service_charge", self.service_charge),
            ("final_total", self.final_total),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(ValidationError::invalid(field, "must not be negative"));
            }
        }
        let expected = self
            .subtotal
            .checked_add(self.service_charge)
            .ok_or_else(|| out_of_range("final_total"))?;
        if cents(self.final_total) != cents(expected) {
            return Err(ValidationError::invalid(
                "final_total",
                format!(
                    "{} does not equal subtotal {} plus service charge {}",
                    self.final_total, self.subtotal, self.service_charge
                ),
            ));
        }
        Ok(())
    }

    fn validate_items(&self) -> ValidationResult<()> {
        for (index, item) in self.items.iter().enumerate() {
            if !item.cancelled {
                item.validate(index)?;
            }
        }
        self.items_total().ok_or_else(|| out_of_range("items"))?;
        Ok(())
    }
}

/// Every order of one table, for the summary ticket printed at the reception
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummaryAggregate {
    pub table_number: u32,
    /// In assignment order
    #[serde(default)]
    pub waiter_names: Vec<String>,
    /// In creation order
    pub orders: Vec<OrderAggregate>,
    pub current_total: Decimal,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub ended_at: Option<i64>,
}

impl TableSummaryAggregate {
    /// Orders that are printed and counted
    pub fn active_orders(&self) -> impl Iterator<Item = &OrderAggregate> {
        self.orders.iter().filter(|order| !order.cancelled)
    }

    /// Copy without cancelled orders and cancelled items
    pub fn without_cancelled(&self) -> Self {
        let mut summary = self.clone();
        summary.orders = self
            .active_orders()
            .map(OrderAggregate::without_cancelled_items)
            .collect();
        summary
    }

    /// Sum of the service charges of active orders, `None` on overflow
    pub fn service_charge_total(&self) -> Option<Decimal> {
        checked_sum(self.active_orders().map(|order| Some(order.service_charge)))
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.table_number == 0 {
            return Err(ValidationError::missing("table_number"));
        }
        if self.current_total.is_sign_negative() && !self.current_total.is_zero() {
            return Err(ValidationError::invalid("current_total", "must not be negative"));
        }
        if self.waiter_names.iter().any(|name| name.trim().is_empty()) {
            return Err(ValidationError::invalid("waiter_names", "contains an empty name"));
        }
        for order in self.active_orders() {
            order.validate_items()?;
        }
        let items = checked_sum(self.active_orders().map(OrderAggregate::items_total));
        let service = self.service_charge_total();
        match (items, service) {
            (Some(items), Some(service)) if items.checked_add(service).is_some() => Ok(()),
            _ => Err(out_of_range("orders")),
        }
    }
}

fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum that stops at the first missing term or overflow
fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value?))
}

fn out_of_range(field: impl Into<String>) -> ValidationError {
    ValidationError::invalid(field, "amount out of range")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order(items: Vec<LineItem>, service_charge: &str) -> OrderAggregate {
        let subtotal: Decimal = items
            .iter()
            .filter(|i| !i.cancelled)
            .map(|i| i.line_total().unwrap())
            .sum();
        let service_charge = money(service_charge);
        OrderAggregate {
            id: "o1".to_string(),
            table_number: 7,
            waiter_name: "Joao".to_string(),
            created_at: 1_700_000_000_000,
            items,
            subtotal,
            service_charge,
            final_total: subtotal + service_charge,
            cancelled: false,
        }
    }

    #[test]
    fn test_items_total_skips_cancelled() {
        let mut cancelled = LineItem::new("p2", "Coca-Cola", money("6.00"), 2);
        cancelled.cancelled = true;
        let o = order(
            vec![LineItem::new("p1", "X-Burger", money("28.90"), 1), cancelled],
            "0",
        );
        assert_eq!(o.items_total(), Some(money("28.90")));
        assert_eq!(o.active_items().count(), 1);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut o = order(vec![LineItem::new("p1", "X-Burger", money("28.90"), 1)], "0");
        assert!(o.validate().is_ok());

        o.waiter_name = "  ".to_string();
        assert_eq!(o.validate(), Err(ValidationError::missing("waiter_name")));

        let mut o = order(vec![LineItem::new("p1", "", money("28.90"), 1)], "0");
        assert!(matches!(
            o.validate(),
            Err(ValidationError::Missing(f)) if f == "items[0].product_name"
        ));

        o.items[0].product_name = "X-Burger".to_string();
        o.items[0].quantity = 0;
        assert!(o.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inconsistent_total() {
        let mut o = order(vec![LineItem::new("p1", "X-Burger", money("28.90"), 1)], "2.89");
        assert!(o.validate().is_ok());
        o.final_total = money("28.90");
        assert!(matches!(
            o.validate(),
            Err(ValidationError::Invalid { field, .. }) if field == "final_total"
        ));
    }

    #[test]
    fn test_validate_rejects_overflowing_amounts() {
        let huge = money("50000000000000000000000000000");
        let mut item = LineItem::new("p1", "Caviar", huge, 1);
        let mut o = order(vec![item.clone()], "0");
        assert!(o.validate().is_ok());

        // Same price twice no longer fits
        item.quantity = 2;
        assert_eq!(item.line_total(), None);
        o.items = vec![item.clone()];
        assert!(matches!(
            o.validate(),
            Err(ValidationError::Invalid { field, .. }) if field == "items[0]"
        ));

        // Each line fits, their sum does not
        item.quantity = 1;
        o.items = vec![item.clone(), item.clone()];
        assert_eq!(o.items_total(), None);
        assert!(matches!(
            o.validate(),
            Err(ValidationError::Invalid { field, .. }) if field == "items"
        ));

        // Subtotal plus service charge does not fit
        let mut o = order(vec![LineItem::new("p1", "Agua", money("4.00"), 1)], "0");
        o.subtotal = Decimal::MAX;
        o.service_charge = Decimal::ONE;
        assert!(matches!(
            o.validate(),
            Err(ValidationError::Invalid { field, .. }) if field == "final_total"
        ));
    }

    #[test]
    fn test_summary_validate_rejects_overflow_across_orders() {
        let huge = money("50000000000000000000000000000");
        let one = order(vec![LineItem::new("p1", "Caviar", huge, 1)], "0");
        let summary = TableSummaryAggregate {
            table_number: 3,
            waiter_names: vec![],
            orders: vec![one.clone(), one],
            current_total: Decimal::ZERO,
            started_at: None,
            ended_at: None,
        };
        assert!(matches!(
            summary.validate(),
            Err(ValidationError::Invalid { field, .. }) if field == "orders"
        ));
    }

    #[test]
    fn test_without_cancelled_is_idempotent() {
        let mut cancelled_item = LineItem::new("p2", "Suco", money("9.00"), 1);
        cancelled_item.cancelled = true;
        let first = order(
            vec![LineItem::new("p1", "Agua", money("4.00"), 1), cancelled_item],
            "0",
        );
        let mut cancelled_order =
            order(vec![LineItem::new("p3", "Pastel", money("12.00"), 2)], "1.20");
        cancelled_order.cancelled = true;

        let summary = TableSummaryAggregate {
            table_number: 3,
            waiter_names: vec!["Ana".to_string()],
            orders: vec![first, cancelled_order],
            current_total: money("4.00"),
            started_at: None,
            ended_at: None,
        };

        let once = summary.without_cancelled();
        let twice = once.without_cancelled();
        assert_eq!(once, twice);
        assert_eq!(once.orders.len(), 1);
        assert_eq!(once.orders[0].items.len(), 1);
        assert_eq!(summary.service_charge_total(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_deserialize_with_numbers() {
        let json = r#"{
            "table_number": 5,
            "waiter_name": "Carlos",
            "created_at": 1700000000000,
            "items": [
                {"product_id": "p1", "product_name": "X-Burger", "unit_price": 28.90, "quantity": 1}
            ],
            "subtotal": 28.90,
            "final_total": 28.90
        }"#;
        let o: OrderAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(o.items[0].unit_price, money("28.90"));
        assert_eq!(o.service_charge, Decimal::ZERO);
        assert!(o.validate().is_ok());
    }
}
