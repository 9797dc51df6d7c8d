//! Error types for ledger validation

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Validation errors raised before records enter the ledger
///
/// The optimizer itself never fails; these are returned by the
/// `validate` helpers and the split builders so callers can refuse
/// bad input upstream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Amount is negative
    #[error("Invalid amount for {field}: {amount}")]
    InvalidAmount {
        /// Which field carried the amount
        field: &'static str,
        /// Offending value
        amount: Decimal,
    },

    /// Amount is above [`crate::MAX_AMOUNT`]
    #[error("Amount for {field} exceeds the maximum: {amount}")]
    AmountTooLarge {
        /// Which field carried the amount
        field: &'static str,
        /// Offending value
        amount: Decimal,
    },

    /// Expense has no split participants
    #[error("Expense has no splits")]
    EmptySplit,

    /// Split shares do not add up to the expense total
    #[error("Split total {split_total} does not match expense amount {amount}")]
    SplitMismatch {
        /// Expense amount
        amount: Decimal,
        /// Sum of split shares
        split_total: Decimal,
    },

    /// Equal split requested over an empty member list
    #[error("Cannot split an expense between zero participants")]
    NoParticipants,
}
