//! Split construction for new expenses

use crate::{rounding::round_currency, types::*, Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How an expense is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    /// Every member pays the same share
    #[default]
    Equal,
    /// Shares supplied by the caller
    Custom,
}

/// Share `amount` equally between `members`
///
/// Each share is rounded to cents; the rounding remainder goes to the first
/// member so the shares always add up to `amount`.
pub fn equal_split(amount: Decimal, members: &[UserId]) -> Result<Vec<Split>> {
    if amount < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            field: "expense.amount",
            amount,
        });
    }
    if members.is_empty() {
        return Err(Error::NoParticipants);
    }

    let count = Decimal::from(members.len());
    let per_member = round_currency(amount / count);
    let mut splits: Vec<Split> = members
        .iter()
        .map(|m| Split::new(m.clone(), per_member))
        .collect();

    let diff = round_currency(amount - per_member * count);
    if !diff.is_zero() {
        splits[0].amount = round_currency(splits[0].amount + diff);
    }

    Ok(splits)
}
