//! Groups and their balance views

use crate::{
    config::GroupDefaults,
    ledger::{BalanceSummary, GroupLedger},
    metrics::Metrics,
    models::*,
    store::LedgerStore,
    Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_core::{round_currency, SettlementStatus, Transfer, UserId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_GROUP_NAME: usize = 100;

/// Request to create a group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewGroup {
    /// Name
    pub name: String,

    /// Kind
    pub kind: GroupKind,

    /// Currency code, defaults from config
    pub currency: Option<String>,

    /// Currency symbol, defaults from config
    pub currency_symbol: Option<String>,
}

/// Most recent expense in a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastActivity {
    /// Expense description
    pub description: String,

    /// Expense timestamp
    pub date: DateTime<Utc>,

    /// Payer
    pub added_by: UserId,
}

/// Group list entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Group
    pub group: Group,

    /// Caller's position
    pub balance: BalanceSummary,

    /// Last expense
    pub last_activity: Option<LastActivity>,

    /// Number of expenses
    pub expense_count: usize,
}

/// Paid/owed totals of one member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    /// Expenses paid plus settlements sent
    pub paid: Decimal,

    /// Shares owed plus settlements received
    pub owes: Decimal,

    /// `paid - owes`, rounded
    pub net: Decimal,
}

/// Full group view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    /// Group
    pub group: Group,

    /// Expenses, newest first
    pub expenses: Vec<ExpenseRecord>,

    /// Caller's position
    pub balance: BalanceSummary,

    /// Per-member totals
    pub member_balances: BTreeMap<UserId, MemberBalance>,

    /// Suggested transfers
    pub optimized_transfers: Vec<Transfer>,

    /// Pending settlements involving the caller
    pub pending_settlements: Vec<SettlementRecord>,
}

/// Group lifecycle and balance views
#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn LedgerStore>,
    defaults: GroupDefaults,
    metrics: Metrics,
}

impl GroupService {
    /// Create new group service
    pub fn new(store: Arc<dyn LedgerStore>, defaults: GroupDefaults, metrics: Metrics) -> Self {
        Self {
            store,
            defaults,
            metrics,
        }
    }

    /// Create a group owned by `owner`
    pub async fn create_group(&self, owner: &UserId, request: NewGroup) -> Result<Group> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Group name is required".to_string()));
        }
        if name.chars().count() > MAX_GROUP_NAME {
            return Err(Error::Validation(format!(
                "Group name must be at most {} characters",
                MAX_GROUP_NAME
            )));
        }

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: request.kind,
            currency: request
                .currency
                .unwrap_or_else(|| self.defaults.default_currency.clone()),
            currency_symbol: request
                .currency_symbol
                .unwrap_or_else(|| self.defaults.default_currency_symbol.clone()),
            owner: owner.clone(),
            members: vec![Member {
                user: owner.clone(),
                role: MemberRole::Owner,
                joined_at: now,
            }],
            archived: false,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_group(group.clone()).await?;
        info!(group_id = %group.id, owner = %owner, "Group created");
        Ok(group)
    }

    /// Add `user` to a group
    pub async fn join(&self, user: &UserId, group_id: GroupId) -> Result<Group> {
        let mut group = self.fetch(group_id).await?;

        if group.archived {
            return Err(Error::GroupArchived(group_id));
        }
        if group.is_member(user) {
            return Err(Error::Validation(
                "Already a member of this group".to_string(),
            ));
        }

        let now = Utc::now();
        group.members.push(Member {
            user: user.clone(),
            role: MemberRole::Member,
            joined_at: now,
        });
        group.updated_at = now;
        self.store.update_group(group.clone()).await?;

        info!(group_id = %group_id, user = %user, "Member joined");
        Ok(group)
    }

    /// Archive a group; owner only
    pub async fn archive(&self, actor: &UserId, group_id: GroupId) -> Result<Group> {
        let mut group = self.fetch(group_id).await?;
        if &group.owner != actor {
            return Err(Error::NotOwner("archive the group".to_string()));
        }

        group.archived = true;
        group.updated_at = Utc::now();
        self.store.update_group(group.clone()).await?;

        info!(group_id = %group_id, "Group archived");
        Ok(group)
    }

    /// Balance summaries for every group `user` belongs to
    pub async fn summaries_for(&self, user: &UserId) -> Result<Vec<GroupSummary>> {
        let groups = self.store.groups_for_member(user).await?;
        let mut summaries = Vec::with_capacity(groups.len());

        for group in groups {
            let ledger = GroupLedger::for_group(self.store.as_ref(), group).await?;
            let transfers = ledger.transfers();
            self.metrics.record_optimization(transfers.len());

            let last_activity = ledger.expenses.last().map(|e| LastActivity {
                description: e.description.clone(),
                date: e.created_at,
                added_by: e.expense.payer.clone(),
            });

            summaries.push(GroupSummary {
                balance: BalanceSummary::from_transfers(user, &transfers, ledger.total_spend()),
                last_activity,
                expense_count: ledger.expenses.len(),
                group: ledger.group,
            });
        }

        debug!(user = %user, groups = summaries.len(), "Group summaries built");
        Ok(summaries)
    }

    /// Full view of one group for a member
    pub async fn detail(&self, user: &UserId, group_id: GroupId) -> Result<GroupDetail> {
        let ledger = GroupLedger::load(self.store.as_ref(), group_id).await?;
        ledger.ensure_member(user)?;

        let transfers = ledger.transfers();
        self.metrics.record_optimization(transfers.len());

        let member_balances = member_balances(&ledger);
        let balance = BalanceSummary::from_transfers(user, &transfers, ledger.total_spend());

        let pending_settlements = self
            .store
            .settlements_for_group(group_id, Some(SettlementStatus::Pending))
            .await?
            .into_iter()
            .filter(|s| &s.settlement.from == user || &s.settlement.to == user)
            .collect();

        let mut expenses = ledger.expenses;
        expenses.reverse();
        expenses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(GroupDetail {
            group: ledger.group,
            expenses,
            balance,
            member_balances,
            optimized_transfers: transfers,
            pending_settlements,
        })
    }

    async fn fetch(&self, group_id: GroupId) -> Result<Group> {
        self.store
            .group(group_id)
            .await?
            .ok_or(Error::GroupNotFound(group_id))
    }
}

impl std::fmt::Debug for GroupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupService")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Paid/owed totals for current members only
///
/// Former members and strangers referenced by the ledger are not tracked.
fn member_balances(ledger: &GroupLedger) -> BTreeMap<UserId, MemberBalance> {
    let mut balances: BTreeMap<UserId, MemberBalance> = ledger
        .group
        .members
        .iter()
        .map(|m| (m.user.clone(), MemberBalance::default()))
        .collect();

    for record in &ledger.expenses {
        if let Some(payer) = balances.get_mut(&record.expense.payer) {
            payer.paid = payer.paid.saturating_add(record.expense.amount);
        }
        for split in &record.expense.splits {
            if let Some(member) = balances.get_mut(&split.user) {
                member.owes = member.owes.saturating_add(split.amount);
            }
        }
    }

    for record in &ledger.completed {
        let settlement = &record.settlement;
        if let Some(from) = balances.get_mut(&settlement.from) {
            from.paid = from.paid.saturating_add(settlement.amount);
        }
        if let Some(to) = balances.get_mut(&settlement.to) {
            to.owes = to.owes.saturating_add(settlement.amount);
        }
    }

    for balance in balances.values_mut() {
        balance.net = round_currency(balance.paid - balance.owes);
    }

    balances
}
