use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{CatalogError, Result};

/// Decimal places kept on every final price.
pub const PRICE_SCALE: u32 = 2;

/// Final price after a percentage discount, rounded half away from zero to 2 decimals.
///
/// The arithmetic runs on the shortest decimal form of each input, so a price that prints
/// as `10.005` rounds as `10.005` and not as its binary neighbour `10.00499..`.
pub fn compute_final_price(price: f64, discount_percentage: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(CatalogError::invalid("price", price));
    }
    if !discount_percentage.is_finite() || !(0.0..=100.0).contains(&discount_percentage) {
        return Err(CatalogError::invalid("discount_percentage", discount_percentage));
    }

    let p = to_decimal(price).ok_or_else(|| CatalogError::invalid("price", price))?;
    let d = to_decimal(discount_percentage)
        .ok_or_else(|| CatalogError::invalid("discount_percentage", discount_percentage))?;

    let discounted = p
        .checked_mul(d)
        .and_then(|x| x.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|x| p.checked_sub(x))
        .ok_or_else(|| CatalogError::invalid("price", price))?;
    round_decimal(discounted)
        .to_f64()
        .ok_or_else(|| CatalogError::invalid("price", price))
}

/// Apply the final-price rounding policy to an already computed value.
pub fn round_price(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    to_decimal(value)
        .and_then(|d| round_decimal(d).to_f64())
        .unwrap_or(value)
}

/// True when `value` already sits on the 2-decimal grid.
pub fn is_rounded(value: f64) -> bool {
    !value.is_finite() || round_price(value) == value
}

fn round_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// f64 Display is the shortest string that round-trips, which is what the API sent.
fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_str(&value.to_string()).ok()
}
