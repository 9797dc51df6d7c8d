//! Group ledger loading
//!
//! Every balance view starts here: fetch the group, its expenses and its
//! completed settlements, then run the optimizer on the fresh records.
//! Nothing is cached between calls.

use crate::{models::*, store::LedgerStore, Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_core::{
    round_currency, SettlementOptimizer, SettlementStatus, Transfer, UserId, MAX_AMOUNT,
};

/// Snapshot of one group's ledger
#[derive(Debug, Clone)]
pub struct GroupLedger {
    /// Group
    pub group: Group,

    /// Expenses in insertion order
    pub expenses: Vec<ExpenseRecord>,

    /// Completed settlements in insertion order
    pub completed: Vec<SettlementRecord>,
}

impl GroupLedger {
    /// Load the ledger for a group ID
    pub async fn load(store: &dyn LedgerStore, group_id: GroupId) -> Result<Self> {
        let group = store
            .group(group_id)
            .await?
            .ok_or(Error::GroupNotFound(group_id))?;
        Self::for_group(store, group).await
    }

    /// Load the ledger for an already fetched group
    pub async fn for_group(store: &dyn LedgerStore, group: Group) -> Result<Self> {
        let expenses = store.expenses_for_group(group.id).await?;
        let completed = store
            .settlements_for_group(group.id, Some(SettlementStatus::Completed))
            .await?;

        Ok(Self {
            group,
            expenses,
            completed,
        })
    }

    /// Suggested transfers that clear the group
    pub fn transfers(&self) -> Vec<Transfer> {
        SettlementOptimizer::new().optimize(
            self.expenses.iter().map(|e| &e.expense),
            self.completed.iter().map(|s| &s.settlement),
        )
    }

    /// Sum of all expense amounts, rounded
    pub fn total_spend(&self) -> Decimal {
        round_currency(saturating_sum(self.expenses.iter().map(|e| e.expense.amount)))
    }

    /// Require `user` to be a member
    pub fn ensure_member(&self, user: &UserId) -> Result<()> {
        if self.group.is_member(user) {
            Ok(())
        } else {
            Err(Error::NotMember {
                user: user.clone(),
                group: self.group.id,
            })
        }
    }
}

/// Require a strictly positive amount no larger than [`MAX_AMOUNT`]
pub(crate) fn check_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation("Amount must be positive".to_string()));
    }
    if amount > MAX_AMOUNT {
        return Err(Error::Validation(format!(
            "Amount must not exceed {}",
            MAX_AMOUNT
        )));
    }
    Ok(())
}

/// Sum that clamps at the `Decimal` range instead of panicking
pub(crate) fn saturating_sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |total, amount| total.saturating_add(amount))
}

/// One member's position in a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    /// Sum of transfers the member should pay
    pub you_owe: Decimal,

    /// Sum of transfers the member should receive
    pub you_are_owed: Decimal,

    /// Total group spend
    pub total_spend: Decimal,

    /// No transfers left in the group
    pub is_settled: bool,
}

impl BalanceSummary {
    /// Summarize `transfers` from `user`'s point of view
    pub fn from_transfers(user: &UserId, transfers: &[Transfer], total_spend: Decimal) -> Self {
        let mut you_owe = Decimal::ZERO;
        let mut you_are_owed = Decimal::ZERO;

        for transfer in transfers {
            if &transfer.from == user {
                you_owe = you_owe.saturating_add(transfer.amount);
            }
            if &transfer.to == user {
                you_are_owed = you_are_owed.saturating_add(transfer.amount);
            }
        }

        Self {
            you_owe: round_currency(you_owe),
            you_are_owed: round_currency(you_are_owed),
            total_spend: round_currency(total_spend),
            is_settled: transfers.is_empty(),
        }
    }
}
