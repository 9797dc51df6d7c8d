//! Net balance accounting
//!
//! A [`BalanceSheet`] is rebuilt from the group ledger on every call and
//! never persisted. Positive balances are owed money, negative balances
//! owe money.
//!
//! # Example
//!
//! ```text
//! A pays 30 split A/B/C:  A +20, B -10, C -10
//! B pays 30 split A/B/C:  A +10, B +10, C -20
//! ```

use crate::{
    rounding::{is_settled, round_currency},
    types::*,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::warn;

/// Signed running totals keyed by member
///
/// Keys are ordered so that every downstream step sees members in the
/// same sequence regardless of ledger order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSheet {
    balances: BTreeMap<UserId, Decimal>,
}

impl BalanceSheet {
    /// Create empty sheet
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sheet from expenses and completed settlements
    pub fn from_ledger<'a, E, S>(expenses: E, settlements: S) -> Self
    where
        E: IntoIterator<Item = &'a Expense>,
        S: IntoIterator<Item = &'a Settlement>,
    {
        let mut sheet = Self::new();
        for expense in expenses {
            sheet.apply_expense(expense);
        }
        for settlement in settlements {
            sheet.apply_settlement(settlement);
        }
        sheet
    }

    /// Credit the payer with the full amount, debit each split share
    ///
    /// A payer who is also in the split gets both adjustments.
    pub fn apply_expense(&mut self, expense: &Expense) {
        self.credit(&expense.payer, non_negative(expense.amount, "expense"));
        for split in &expense.splits {
            self.debit(&split.user, non_negative(split.amount, "split"));
        }
    }

    /// Apply a completed settlement
    ///
    /// The payer's debt shrinks and the receiver's claim shrinks by the same
    /// amount. Pending settlements are ignored.
    pub fn apply_settlement(&mut self, settlement: &Settlement) {
        if !settlement.is_completed() {
            return;
        }
        let amount = non_negative(settlement.amount, "settlement");
        self.credit(&settlement.from, amount);
        self.debit(&settlement.to, amount);
    }

    /// Raw (unrounded) balance, zero for unknown members
    pub fn balance_of(&self, user: &UserId) -> Decimal {
        self.balances.get(user).copied().unwrap_or(Decimal::ZERO)
    }

    /// Iterate raw balances in member order
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &Decimal)> + '_ {
        self.balances.iter()
    }

    /// Number of members seen in the ledger
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Check if no member was seen
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Sum of all raw balances
    ///
    /// Zero for a ledger whose splits match their expense totals.
    pub fn total(&self) -> Decimal {
        self.balances
            .values()
            .fold(Decimal::ZERO, |total, balance| total.saturating_add(*balance))
    }

    /// Split rounded balances into debtors and creditors
    ///
    /// Balances within one cent of zero are dropped. Both lists come back in
    /// member order; the optimizer sorts them.
    pub fn partition(&self) -> (Vec<Position>, Vec<Position>) {
        let mut debtors = Vec::new();
        let mut creditors = Vec::new();

        for (user, balance) in &self.balances {
            if is_settled(*balance) {
                continue;
            }
            let rounded = round_currency(*balance);
            if rounded < Decimal::ZERO {
                debtors.push(Position::new(user.clone(), rounded.abs()));
            } else {
                creditors.push(Position::new(user.clone(), rounded));
            }
        }

        debug_assert!(
            debtors
                .iter()
                .all(|d| creditors.iter().all(|c| c.user != d.user)),
            "member on both sides of the partition"
        );

        (debtors, creditors)
    }

    fn credit(&mut self, user: &UserId, amount: Decimal) {
        let balance = self.balances.entry(user.clone()).or_insert(Decimal::ZERO);
        let current = *balance;
        *balance = current.checked_add(amount).unwrap_or_else(|| {
            warn!(user = %user, %amount, "balance overflow, saturating");
            current.saturating_add(amount)
        });
    }

    fn debit(&mut self, user: &UserId, amount: Decimal) {
        let balance = self.balances.entry(user.clone()).or_insert(Decimal::ZERO);
        let current = *balance;
        *balance = current.checked_sub(amount).unwrap_or_else(|| {
            warn!(user = %user, %amount, "balance overflow, saturating");
            current.saturating_sub(amount)
        });
    }
}

/// Clamp negative ledger amounts to zero
fn non_negative(amount: Decimal, source: &'static str) -> Decimal {
    if amount < Decimal::ZERO {
        warn!(%amount, source, "negative amount in ledger, clamping to zero");
        Decimal::ZERO
    } else {
        amount
    }
}
