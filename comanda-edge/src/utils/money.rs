//! Currency formatting
//!
//! Amounts are `Decimal` end to end; rounding happens once, when printed.

use rust_decimal::prelude::*;

/// Round to cents, half away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// "R$ 40.90"
pub fn format_brl(value: Decimal) -> String {
    let mut rounded = round_money(value);
    rounded.rescale(2);
    format!("R$ {}", rounded)
}
