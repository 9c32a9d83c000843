//! Table item consolidation
//!
//! A table accumulates several orders; the summary ticket prints one line per
//! `(product_id, unit_price)` pair, in the order the pair first appeared.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::OrderAggregate;
use shared::{ValidationError, ValidationResult};
use std::collections::HashMap;

/// One printed line of the table summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedItem {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Decimal,
    pub total_quantity: u32,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Consolidation {
    pub items: Vec<ConsolidatedItem>,
    /// Sum of line totals
    pub subtotal: Decimal,
    pub total_quantity: u32,
}

/// Merge the active items of the active orders
///
/// Same product at two prices stays on two lines. Decimal equality ignores
/// scale, so 8.0 and 8.00 merge. Amounts too large for a Decimal are an
/// invalid aggregate.
pub fn consolidate<'a, I>(orders: I) -> ValidationResult<Consolidation>
where
    I: IntoIterator<Item = &'a OrderAggregate>,
{
    let mut index: HashMap<(&'a str, Decimal), usize> = HashMap::new();
    let mut out = Consolidation::default();

    for order in orders.into_iter().filter(|o| !o.cancelled) {
        for item in order.active_items() {
            let line_total = item.line_total().ok_or_else(out_of_range)?;
            let key = (item.product_id.as_str(), item.unit_price.normalize());
            match index.get(&key) {
                Some(&i) => {
                    let entry = &mut out.items[i];
                    entry.total_quantity = entry.total_quantity.saturating_add(item.quantity);
                    entry.line_total = entry
                        .line_total
                        .checked_add(line_total)
                        .ok_or_else(out_of_range)?;
                }
                None => {
                    index.insert(key, out.items.len());
                    out.items.push(ConsolidatedItem {
                        product_id: item.product_id.clone(),
                        product_name: item.product_name.clone(),
                        unit_price: item.unit_price,
                        total_quantity: item.quantity,
                        line_total,
                    });
                }
            }
            out.subtotal = out.subtotal.checked_add(line_total).ok_or_else(out_of_range)?;
            out.total_quantity = out.total_quantity.saturating_add(item.quantity);
        }
    }

    Ok(out)
}

fn out_of_range() -> ValidationError {
    ValidationError::invalid("items", "amount out of range")
}
