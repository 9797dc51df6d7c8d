//! Core types for settlement computation

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Group member identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One participant's share of an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Participant
    pub user: UserId,

    /// Share owed by the participant
    pub amount: Decimal,
}

impl Split {
    /// Create new split
    pub fn new(user: UserId, amount: Decimal) -> Self {
        Self { user, amount }
    }
}

/// Expense paid by one member and shared by several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Member who paid
    pub payer: UserId,

    /// Total paid
    pub amount: Decimal,

    /// Shares per participant
    pub splits: Vec<Split>,
}

impl Expense {
    /// Create new expense
    pub fn new(payer: UserId, amount: Decimal, splits: Vec<Split>) -> Self {
        Self {
            payer,
            amount,
            splits,
        }
    }

    /// Sum of all split shares
    pub fn split_total(&self) -> Decimal {
        self.splits
            .iter()
            .fold(Decimal::ZERO, |total, s| total.saturating_add(s.amount))
    }

    /// Check amounts are within range and the shares cover the total
    ///
    /// A mismatch of up to one cent is tolerated to absorb rounding in
    /// client-computed custom splits.
    pub fn validate(&self) -> Result<()> {
        if self.amount < Decimal::ZERO {
            return Err(Error::InvalidAmount {
                field: "expense.amount",
                amount: self.amount,
            });
        }
        if self.amount > crate::MAX_AMOUNT {
            return Err(Error::AmountTooLarge {
                field: "expense.amount",
                amount: self.amount,
            });
        }

        if self.splits.is_empty() {
            return Err(Error::EmptySplit);
        }

        if let Some(split) = self
            .splits
            .iter()
            .find(|s| s.amount < Decimal::ZERO)
        {
            return Err(Error::InvalidAmount {
                field: "split.amount",
                amount: split.amount,
            });
        }
        if let Some(split) = self.splits.iter().find(|s| s.amount > crate::MAX_AMOUNT) {
            return Err(Error::AmountTooLarge {
                field: "split.amount",
                amount: split.amount,
            });
        }

        let split_total = self.split_total();
        if (split_total - self.amount).abs() > crate::SETTLED_THRESHOLD {
            return Err(Error::SplitMismatch {
                amount: self.amount,
                split_total,
            });
        }

        Ok(())
    }
}

/// Settlement lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Recorded but money has not moved yet
    Pending,
    /// Money has changed hands
    Completed,
}

/// Recorded payment between two members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Member who paid
    pub from: UserId,

    /// Member who received
    pub to: UserId,

    /// Amount paid
    pub amount: Decimal,

    /// Status
    pub status: SettlementStatus,
}

impl Settlement {
    /// Create completed settlement
    pub fn completed(from: UserId, to: UserId, amount: Decimal) -> Self {
        Self {
            from,
            to,
            amount,
            status: SettlementStatus::Completed,
        }
    }

    /// Create pending settlement
    pub fn pending(from: UserId, to: UserId, amount: Decimal) -> Self {
        Self {
            from,
            to,
            amount,
            status: SettlementStatus::Pending,
        }
    }

    /// Check if money has moved
    pub fn is_completed(&self) -> bool {
        self.status == SettlementStatus::Completed
    }

    /// Check amount is non-negative and within range
    pub fn validate(&self) -> Result<()> {
        if self.amount < Decimal::ZERO {
            return Err(Error::InvalidAmount {
                field: "settlement.amount",
                amount: self.amount,
            });
        }
        if self.amount > crate::MAX_AMOUNT {
            return Err(Error::AmountTooLarge {
                field: "settlement.amount",
                amount: self.amount,
            });
        }
        Ok(())
    }
}

/// Suggested payment that clears part of a debt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Debtor (pays)
    pub from: UserId,

    /// Creditor (receives)
    pub to: UserId,

    /// Amount, always strictly positive
    pub amount: Decimal,
}

/// Rounded net position of one member
///
/// Used for both sides of the matching: a debtor's `amount` is the
/// magnitude of what they owe, a creditor's is what they are owed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Member
    pub user: UserId,

    /// Remaining magnitude
    pub amount: Decimal,
}

impl Position {
    /// Create new position
    pub fn new(user: UserId, amount: Decimal) -> Self {
        Self { user, amount }
    }
}
