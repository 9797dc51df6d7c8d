//! Spending insights across a user's groups

use crate::{ledger::saturating_sum, models::*, store::LedgerStore, Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_core::{round_currency, UserId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Spend in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Display label
    pub name: String,

    /// Total, rounded
    pub amount: Decimal,
}

/// Group filter option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTab {
    /// Group ID
    pub id: GroupId,

    /// Group name
    pub name: String,
}

/// Monthly spending report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    /// 0 to 100, 100 when everyone paid the same
    pub fairness_score: u32,

    /// Spend this month
    pub total_spent: Decimal,

    /// Caller's split shares this month
    pub your_share: Decimal,

    /// `your_share / total_spent` in percent, one decimal
    pub share_percentage: Decimal,

    /// Percent change against last month
    pub month_change: i64,

    /// Category totals, largest first
    pub categories: Vec<CategoryTotal>,

    /// Groups in scope
    pub group_tabs: Vec<GroupTab>,
}

/// Insights service
#[derive(Clone)]
pub struct InsightsService {
    store: Arc<dyn LedgerStore>,
}

impl InsightsService {
    /// Create new insights service
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Report for `user`, optionally limited to one group
    pub async fn for_user(
        &self,
        user: &UserId,
        group_filter: Option<GroupId>,
        now: DateTime<Utc>,
    ) -> Result<Insights> {
        let groups: Vec<Group> = self
            .store
            .groups_for_member(user)
            .await?
            .into_iter()
            .filter(|g| group_filter.map_or(true, |id| g.id == id))
            .collect();

        let this_month = month_start(now.year(), now.month())?;
        let last_month = if now.month() == 1 {
            month_start(now.year() - 1, 12)?
        } else {
            month_start(now.year(), now.month() - 1)?
        };

        let mut current = Vec::new();
        let mut previous_total = Decimal::ZERO;
        for group in &groups {
            for record in self.store.expenses_for_group(group.id).await? {
                if record.created_at >= this_month {
                    current.push(record);
                } else if record.created_at >= last_month {
                    previous_total = previous_total.saturating_add(record.expense.amount);
                }
            }
        }

        let total = saturating_sum(current.iter().map(|r| r.expense.amount));
        let your_share = saturating_sum(
            current
                .iter()
                .flat_map(|r| r.expense.splits.iter())
                .filter(|s| &s.user == user)
                .map(|s| s.amount),
        );

        let members: BTreeSet<&UserId> = groups
            .iter()
            .flat_map(|g| g.members.iter().map(|m| &m.user))
            .collect();

        let insights = Insights {
            fairness_score: fairness_score(&current, &members, total),
            total_spent: round_currency(total),
            your_share: round_currency(your_share),
            share_percentage: share_percentage(your_share, total),
            month_change: month_change(total, previous_total),
            categories: category_totals(&current),
            group_tabs: groups
                .iter()
                .map(|g| GroupTab {
                    id: g.id,
                    name: g.name.clone(),
                })
                .collect(),
        };

        debug!(user = %user, groups = groups.len(), expenses = current.len(), "Insights computed");
        Ok(insights)
    }
}

impl std::fmt::Debug for InsightsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightsService").finish_non_exhaustive()
    }
}

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| Error::Other(format!("Invalid month {}-{}", year, month)))
}

/// Round to an integer, halves towards positive infinity
fn round_half_up(value: Decimal) -> Decimal {
    value.saturating_add(Decimal::new(5, 1)).floor()
}

/// `part / whole * factor`, clamped at `Decimal::MAX`
fn scaled_ratio(part: Decimal, whole: Decimal, factor: Decimal) -> Decimal {
    part.checked_div(whole)
        .map(|ratio| ratio.saturating_mul(factor))
        .unwrap_or(Decimal::MAX)
}

/// Share of the spend in percent with one decimal; 0 without spend
fn share_percentage(share: Decimal, total: Decimal) -> Decimal {
    if total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_half_up(scaled_ratio(share, total, Decimal::ONE_THOUSAND)) / Decimal::TEN
}

/// Whole-percent change against last month; 0 when last month was empty
fn month_change(total: Decimal, previous: Decimal) -> i64 {
    if previous <= Decimal::ZERO {
        return 0;
    }
    round_half_up(scaled_ratio(total - previous, previous, Decimal::ONE_HUNDRED))
        .to_i64()
        .unwrap_or(i64::MAX)
}

fn category_totals(expenses: &[ExpenseRecord]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&'static str, Decimal> = BTreeMap::new();
    for record in expenses {
        let entry = totals.entry(record.category.label()).or_default();
        *entry = entry.saturating_add(record.expense.amount);
    }

    let mut categories: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(name, amount)| CategoryTotal {
            name: name.to_string(),
            amount: round_currency(amount),
        })
        .collect();
    categories.sort_by(|a, b| b.amount.cmp(&a.amount));
    categories
}

/// How evenly the members carried the spend
///
/// `100 * (1 - sum|paid - ideal| / (2 * total))`, floored at zero.
fn fairness_score(expenses: &[ExpenseRecord], members: &BTreeSet<&UserId>, total: Decimal) -> u32 {
    if members.len() < 2 || total <= Decimal::ZERO {
        return 100;
    }

    let mut paid: BTreeMap<&UserId, Decimal> = BTreeMap::new();
    for record in expenses {
        let entry = paid.entry(&record.expense.payer).or_default();
        *entry = entry.saturating_add(record.expense.amount);
    }

    let ideal = total / Decimal::from(members.len());
    let deviation = saturating_sum(
        members
            .iter()
            .map(|member| (paid.get(member).copied().unwrap_or_default() - ideal).abs()),
    );

    let unfairness = scaled_ratio(deviation, total, Decimal::new(5, 1));
    let score = round_half_up(Decimal::ONE_HUNDRED.saturating_mul(Decimal::ONE - unfairness));
    score.max(Decimal::ZERO).to_u32().unwrap_or_default()
}
