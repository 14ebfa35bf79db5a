//! Reading value normalization to base units

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::UnitOfMeasure;

/// Normalize a raw reading value to its base unit.
///
/// Temperatures convert to Celsius; kilo-prefixed electrical units scale
/// to their base unit. Converted values are rounded to at most
/// `max_decimal_scale` places, or kept unrounded when the scale is
/// negative. Values in other units pass through unchanged. A missing unit
/// is treated as `Wh`, the protocol default.
pub fn normalized_value(
    unit: Option<UnitOfMeasure>,
    value: Decimal,
    max_decimal_scale: i32,
) -> Decimal {
    match unit.unwrap_or_default() {
        UnitOfMeasure::Fahrenheit => round(
            (value - Decimal::from(32)) * Decimal::from(5) / Decimal::from(9),
            max_decimal_scale,
        ),
        UnitOfMeasure::K => round(value - Decimal::new(27315, 2), max_decimal_scale),
        UnitOfMeasure::KWh
        | UnitOfMeasure::KW
        | UnitOfMeasure::KVA
        | UnitOfMeasure::Kvar
        | UnitOfMeasure::Kvarh => value * Decimal::ONE_THOUSAND,
        _ => value,
    }
}

fn round(value: Decimal, max_decimal_scale: i32) -> Decimal {
    if max_decimal_scale < 0 {
        return value;
    }
    value.round_dp_with_strategy(max_decimal_scale as u32, RoundingStrategy::MidpointAwayFromZero)
}

// ── Tests ──────────────────────────────────────────────────────
