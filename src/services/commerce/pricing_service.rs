use crate::{errors::ServiceError, money};
use rust_decimal::Decimal;
use serde::Serialize;

/// Flat shipping surcharge applied below the free-shipping threshold.
pub const FLAT_RATE_SHIPPING_CENTS: i64 = 500;
/// Subtotals at or above this amount ship free.
pub const FREE_SHIPPING_THRESHOLD_CENTS: i64 = 10_000;

/// Shipping rule used by both the cart preview and checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingService {
    flat_rate_cents: i64,
    free_shipping_threshold_cents: i64,
}

impl Default for PricingService {
    fn default() -> Self {
        Self {
            flat_rate_cents: FLAT_RATE_SHIPPING_CENTS,
            free_shipping_threshold_cents: FREE_SHIPPING_THRESHOLD_CENTS,
        }
    }
}

/// Result of a totals computation, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub grand_total_cents: i64,
}

/// Decimal rendering of [`Totals`] for responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TotalsView {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub grand_total: Decimal,
}

impl From<Totals> for TotalsView {
    fn from(totals: Totals) -> Self {
        Self {
            subtotal: money::from_cents(totals.subtotal_cents),
            shipping: money::from_cents(totals.shipping_cents),
            grand_total: money::from_cents(totals.grand_total_cents),
        }
    }
}

impl PricingService {
    pub fn new(flat_rate_cents: i64, free_shipping_threshold_cents: i64) -> Self {
        Self {
            flat_rate_cents,
            free_shipping_threshold_cents,
        }
    }

    /// Shipping charged for a given subtotal.
    pub fn shipping_for(&self, subtotal_cents: i64) -> i64 {
        if subtotal_cents > 0 && subtotal_cents < self.free_shipping_threshold_cents {
            self.flat_rate_cents
        } else {
            0
        }
    }

    /// Computes subtotal, shipping and grand total from `(unit_price_cents, quantity)` lines.
    pub fn calculate_totals<I>(&self, lines: I) -> Result<Totals, ServiceError>
    where
        I: IntoIterator<Item = (i64, i32)>,
    {
        let mut subtotal_cents: i64 = 0;
        for (unit_cents, quantity) in lines {
            let line = money::line_total_cents(unit_cents, quantity)?;
            subtotal_cents = subtotal_cents
                .checked_add(line)
                .ok_or_else(|| ServiceError::ValidationError("Subtotal overflows".to_string()))?;
        }

        let shipping_cents = self.shipping_for(subtotal_cents);
        let grand_total_cents = subtotal_cents
            .checked_add(shipping_cents)
            .ok_or_else(|| ServiceError::ValidationError("Grand total overflows".to_string()))?;

        Ok(Totals {
            subtotal_cents,
            shipping_cents,
            grand_total_cents,
        })
    }
}
