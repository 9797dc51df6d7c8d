//! Currency rounding policy
//!
//! All balances and transfer amounts are quantized to cents using
//! half-away-from-zero rounding, the same rule used for display.

use rust_decimal::{Decimal, RoundingStrategy};

/// Balances whose rounded magnitude is at or below this are settled
pub const SETTLED_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest amount accepted for a single expense, split or settlement
///
/// Keeps every group's running totals far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Round to 2 decimal places, half away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// True when a rounded balance no longer needs a transfer
pub fn is_settled(amount: Decimal) -> bool {
    round_currency(amount).abs() <= SETTLED_THRESHOLD
}
