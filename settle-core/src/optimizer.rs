//! Settlement optimizer
//!
//! Turns a group ledger into the short list of payments that clears every
//! balance.
//!
//! # Algorithm
//!
//! 1. Accrue net balances from expenses and completed settlements
//! 2. Round to cents and drop balances within one cent of zero
//! 3. Sort debtors and creditors by amount, largest first
//! 4. Match the largest debtor with the largest creditor until one side runs out
//!
//! The matching is greedy. It never produces a cycle and emits at most
//! `debtors + creditors - 1` transfers, but it is not a proof of the global
//! minimum for every ledger.
//!
//! # Example
//!
//! ```text
//! Net positions:
//!   A: +10  B: +10  C: -20
//!
//! Transfers:
//!   C pays A: 10
//!   C pays B: 10
//! ```

use crate::{
    balance::BalanceSheet,
    rounding::{round_currency, SETTLED_THRESHOLD},
    types::*,
};
use rust_decimal::Decimal;
use tracing::debug;

/// Greedy largest-debtor/largest-creditor matcher
///
/// Stateless: every call starts from a fresh [`BalanceSheet`], so the type
/// is freely shareable across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementOptimizer;

impl SettlementOptimizer {
    /// Create new optimizer
    pub fn new() -> Self {
        Self
    }

    /// Compute transfers for a group ledger
    pub fn optimize<'a, E, S>(&self, expenses: E, settlements: S) -> Vec<Transfer>
    where
        E: IntoIterator<Item = &'a Expense>,
        S: IntoIterator<Item = &'a Settlement>,
    {
        let sheet = BalanceSheet::from_ledger(expenses, settlements);
        self.settle(&sheet)
    }

    /// Compute transfers for an already accrued sheet
    pub fn settle(&self, sheet: &BalanceSheet) -> Vec<Transfer> {
        let (mut debtors, mut creditors) = sheet.partition();

        sort_largest_first(&mut debtors);
        sort_largest_first(&mut creditors);

        let transfers = match_positions(&mut debtors, &mut creditors);

        debug!(
            members = sheet.len(),
            debtors = debtors.len(),
            creditors = creditors.len(),
            transfers = transfers.len(),
            "Settlement optimized"
        );

        transfers
    }
}

/// Compute transfers for a group ledger
///
/// Convenience wrapper over [`SettlementOptimizer::optimize`].
pub fn optimize(expenses: &[Expense], completed_settlements: &[Settlement]) -> Vec<Transfer> {
    SettlementOptimizer.optimize(expenses, completed_settlements)
}

/// Descending by amount, ascending member id on ties
fn sort_largest_first(positions: &mut [Position]) {
    positions.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.user.cmp(&b.user)));
}

fn match_positions(debtors: &mut [Position], creditors: &mut [Position]) -> Vec<Transfer> {
    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < debtors.len() && j < creditors.len() {
        let transfer_amount = debtors[i].amount.min(creditors[j].amount);
        let rounded = round_currency(transfer_amount);

        if rounded > Decimal::ZERO {
            transfers.push(Transfer {
                from: debtors[i].user.clone(),
                to: creditors[j].user.clone(),
                amount: rounded,
            });
        }

        debtors[i].amount -= transfer_amount;
        creditors[j].amount -= transfer_amount;

        if debtors[i].amount < SETTLED_THRESHOLD {
            i += 1;
        }
        if creditors[j].amount < SETTLED_THRESHOLD {
            j += 1;
        }
    }

    transfers
}
