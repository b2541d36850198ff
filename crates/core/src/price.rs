//! Price resolution in minor currency units.
//!
//! Products may carry an integer minor-unit price, a float major-unit price,
//! or neither. All money math in the cart core happens in integer cents; the
//! float field exists only for legacy catalog rows and is converted once,
//! here.

/// Resolve a price in cents from the two catalog price fields.
///
/// Prefers the integer minor-unit field. The float fallback multiplies by 100
/// and rounds half to even (banker's rounding), which keeps the conversion
/// stable across platforms. Returns `None` when neither field is set.
pub fn resolve_cents(price_cents: Option<i64>, price: Option<f64>) -> Option<i64> {
    if let Some(cents) = price_cents {
        return Some(cents);
    }
    price.map(|major| (major * 100.0).round_ties_even() as i64)
}

/// Line total for a quantity of items at a known unit price.
pub fn line_total_cents(unit_price_cents: Option<i64>, quantity: i64) -> Option<i64> {
    unit_price_cents.map(|cents| cents * quantity)
}
