//! Two-place currency handling.
//!
//! Amounts travel through the API as [`Decimal`] and are stored as integer
//! minor units so the database never rounds them.

use crate::errors::ServiceError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Number of fractional digits carried by every amount.
pub const SCALE: u32 = 2;

/// Converts integer cents into a two-place decimal.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// Converts a decimal amount to integer cents.
///
/// Amounts with more than two significant fractional digits are rejected
/// rather than rounded.
pub fn to_cents(amount: Decimal) -> Result<i64, ServiceError> {
    let normalized = amount.normalize();
    if normalized.scale() > SCALE {
        return Err(ServiceError::ValidationError(format!(
            "Amount {} has more than {} decimal places",
            amount, SCALE
        )));
    }
    normalized
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.trunc().to_i64())
        .ok_or_else(|| ServiceError::ValidationError(format!("Amount {} is out of range", amount)))
}

/// Parses user-provided text (e.g. a CSV cell) into cents.
pub fn parse_cents(raw: &str) -> Option<i64> {
    let amount: Decimal = raw.trim().parse().ok()?;
    to_cents(amount).ok()
}

/// `unit_cents * quantity`, failing on overflow.
pub fn line_total_cents(unit_cents: i64, quantity: i32) -> Result<i64, ServiceError> {
    unit_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| ServiceError::ValidationError("Line total overflows".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0.01), 1)]
    #[case(dec!(5), 500)]
    #[case(dec!(19.90), 1990)]
    #[case(dec!(19.900), 1990)]
    #[case(dec!(-3.25), -325)]
    fn converts_to_cents(#[case] amount: Decimal, #[case] cents: i64) {
        assert_eq!(to_cents(amount).unwrap(), cents);
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert!(to_cents(dec!(1.005)).is_err());
    }

    #[test]
    fn cents_render_with_two_places() {
        assert_eq!(from_cents(1500).to_string(), "15.00");
        assert_eq!(from_cents(7).to_string(), "0.07");
    }

    #[rstest]
    #[case("12.50", Some(1250))]
    #[case(" 3 ", Some(300))]
    #[case("abc", None)]
    #[case("1.234", None)]
    #[case("", None)]
    fn parses_text(#[case] raw: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_cents(raw), expected);
    }

    #[test]
    fn huge_amounts_are_out_of_range() {
        assert!(to_cents(Decimal::MAX).is_err());
    }

    #[test]
    fn line_total_detects_overflow() {
        assert_eq!(line_total_cents(250, 4).unwrap(), 1000);
        assert!(line_total_cents(i64::MAX, 2).is_err());
    }
}
