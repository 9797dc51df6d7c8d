//! Expense recording

use crate::{ledger::check_amount, models::*, store::LedgerStore, Error, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_core::{equal_split, Expense, Split, SplitKind, UserId};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Request to record an expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    /// Group
    pub group_id: GroupId,

    /// Description
    pub description: String,

    /// Total paid
    pub amount: Decimal,

    /// Category
    #[serde(default)]
    pub category: Category,

    /// Payer, defaults to the caller
    pub paid_by: Option<UserId>,

    /// Requested split kind
    #[serde(default)]
    pub split_kind: SplitKind,

    /// Shares for custom splits
    #[serde(default)]
    pub splits: Vec<Split>,
}

/// Records expenses against a group ledger
#[derive(Clone)]
pub struct ExpenseService {
    store: Arc<dyn LedgerStore>,
}

impl ExpenseService {
    /// Create new expense service
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Record an expense paid in a group
    ///
    /// Custom splits are used as given; anything else is shared equally
    /// between all current members.
    pub async fn add_expense(&self, actor: &UserId, request: NewExpense) -> Result<ExpenseRecord> {
        let description = request.description.trim();
        if description.is_empty() {
            return Err(Error::Validation("Description is required".to_string()));
        }
        check_amount(request.amount)?;

        let mut group = self
            .store
            .group(request.group_id)
            .await?
            .ok_or(Error::GroupNotFound(request.group_id))?;

        if group.archived {
            return Err(Error::GroupArchived(group.id));
        }
        if !group.is_member(actor) {
            return Err(Error::NotMember {
                user: actor.clone(),
                group: group.id,
            });
        }

        let payer = request.paid_by.unwrap_or_else(|| actor.clone());
        let (split_kind, splits) = match request.split_kind {
            SplitKind::Custom if !request.splits.is_empty() => (SplitKind::Custom, request.splits),
            _ => (
                SplitKind::Equal,
                equal_split(request.amount, &group.member_ids())?,
            ),
        };

        let expense = Expense::new(payer, request.amount, splits);
        expense.validate()?;

        let now = Utc::now();
        let record = ExpenseRecord {
            id: Uuid::new_v4(),
            group_id: group.id,
            description: description.to_string(),
            category: request.category,
            split_kind,
            expense,
            created_at: now,
        };
        self.store.insert_expense(record.clone()).await?;

        group.updated_at = now;
        self.store.update_group(group).await?;

        info!(
            group_id = %record.group_id,
            expense_id = %record.id,
            amount = %record.expense.amount,
            "Expense recorded"
        );
        Ok(record)
    }

    /// Expenses of a group, newest first; members only
    pub async fn list_expenses(&self, actor: &UserId, group_id: GroupId) -> Result<Vec<ExpenseRecord>> {
        let group = self
            .store
            .group(group_id)
            .await?
            .ok_or(Error::GroupNotFound(group_id))?;
        if !group.is_member(actor) {
            return Err(Error::NotMember {
                user: actor.clone(),
                group: group_id,
            });
        }

        let mut expenses = self.store.expenses_for_group(group_id).await?;
        expenses.reverse();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(expenses)
    }
}

impl std::fmt::Debug for ExpenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseService").finish_non_exhaustive()
    }
}
