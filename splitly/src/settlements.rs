//! Settlement views and settle actions
//!
//! `settle_all` is the only write path that materializes optimizer output.
//! Two guards keep concurrent requests from double-writing a group:
//!
//! - a per-group async lock serializes compute-then-write
//! - an optional idempotency key replays the first result for retries
//!
//! Replays expire after a TTL and idle group locks are dropped, so neither
//! map outgrows the set of groups currently being settled.

use crate::{
    ledger::{check_amount, saturating_sum, GroupLedger},
    metrics::Metrics, models::*, store::LedgerStore, Error, Result,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_core::{round_currency, Settlement, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Suggested transfer with display records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferView {
    /// Debtor
    pub from: MemberView,

    /// Creditor
    pub to: MemberView,

    /// Amount
    pub amount: Decimal,

    /// Description of the first expense the creditor paid
    pub context: String,
}

/// Settlements screen for a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOverview {
    /// Sum of all suggested transfers
    pub total_to_settle: Decimal,

    /// Number of suggested transfers
    pub pending_count: usize,

    /// Suggested transfers
    pub transfers: Vec<TransferView>,

    /// Group currency symbol
    pub currency_symbol: String,
}

/// Request to record one payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleSettlement {
    /// Payer
    pub from: UserId,

    /// Receiver
    pub to: UserId,

    /// Amount
    pub amount: Decimal,
}

/// Replay window when none is configured
const DEFAULT_REPLAY_TTL_SECS: i64 = 24 * 60 * 60;

/// Settle-all result kept for an idempotency key
#[derive(Debug, Clone)]
struct Replay {
    stored_at: DateTime<Utc>,
    records: Vec<SettlementRecord>,
}

/// Settlement service
pub struct SettlementService {
    store: Arc<dyn LedgerStore>,
    metrics: Metrics,
    replay_ttl: Duration,
    group_locks: DashMap<GroupId, Arc<Mutex<()>>>,
    replays: DashMap<(GroupId, String), Replay>,
}

impl SettlementService {
    /// Create new settlement service
    pub fn new(store: Arc<dyn LedgerStore>, metrics: Metrics) -> Self {
        Self {
            store,
            metrics,
            replay_ttl: Duration::seconds(DEFAULT_REPLAY_TTL_SECS),
            group_locks: DashMap::new(),
            replays: DashMap::new(),
        }
    }

    /// Set how long settle-all results stay replayable
    pub fn with_replay_ttl(mut self, ttl: Duration) -> Self {
        self.replay_ttl = ttl;
        self
    }

    /// Suggested transfers for a group, with display records
    pub async fn overview(&self, group_id: GroupId) -> Result<SettlementOverview> {
        let ledger = GroupLedger::load(self.store.as_ref(), group_id).await?;
        let transfers = ledger.transfers();
        self.metrics.record_optimization(transfers.len());

        let mut members: HashMap<UserId, MemberView> = HashMap::new();
        for member in &ledger.group.members {
            let view = match self.store.user(&member.user).await? {
                Some(user) => MemberView::from(&user),
                None => MemberView::unknown(member.user.clone()),
            };
            members.insert(member.user.clone(), view);
        }

        let mut context: HashMap<&UserId, &str> = HashMap::new();
        for record in &ledger.expenses {
            context
                .entry(&record.expense.payer)
                .or_insert(record.description.as_str());
        }

        let view = |user: &UserId| {
            members
                .get(user)
                .cloned()
                .unwrap_or_else(|| MemberView::unknown(user.clone()))
        };

        let total = saturating_sum(transfers.iter().map(|t| t.amount));
        let views = transfers
            .iter()
            .map(|t| TransferView {
                from: view(&t.from),
                to: view(&t.to),
                amount: t.amount,
                context: context.get(&t.to).copied().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(SettlementOverview {
            total_to_settle: round_currency(total),
            pending_count: transfers.len(),
            transfers: views,
            currency_symbol: ledger.group.currency_symbol.clone(),
        })
    }

    /// Record every suggested transfer as a completed settlement
    ///
    /// A repeated `idempotency_key` for the same group returns the records
    /// written by the first call without writing again, until the replay
    /// TTL passes.
    pub async fn settle_all(
        &self,
        group_id: GroupId,
        idempotency_key: Option<&str>,
    ) -> Result<Vec<SettlementRecord>> {
        let lock = self.group_lock(group_id);
        let result = {
            let _guard = lock.lock().await;
            self.settle_all_locked(group_id, idempotency_key).await
        };
        drop(lock);
        self.release_group_lock(group_id);
        result
    }

    async fn settle_all_locked(
        &self,
        group_id: GroupId,
        idempotency_key: Option<&str>,
    ) -> Result<Vec<SettlementRecord>> {
        self.evict_expired_replays(Utc::now());

        if let Some(key) = idempotency_key {
            if let Some(previous) = self.replays.get(&(group_id, key.to_string())) {
                debug!(group_id = %group_id, key, "Replaying settle-all");
                return Ok(previous.records.clone());
            }
        }

        let ledger = GroupLedger::load(self.store.as_ref(), group_id).await?;
        let transfers = ledger.transfers();
        self.metrics.record_optimization(transfers.len());

        let now = Utc::now();
        let mut written = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            let record = SettlementRecord::new(
                group_id,
                Settlement::completed(transfer.from, transfer.to, transfer.amount),
                now,
            );
            self.store.insert_settlement(record.clone()).await?;
            written.push(record);
        }

        if let Some(key) = idempotency_key {
            self.replays.insert(
                (group_id, key.to_string()),
                Replay {
                    stored_at: now,
                    records: written.clone(),
                },
            );
        }

        self.metrics.record_settle_all(written.len());
        info!(group_id = %group_id, settlements = written.len(), "All balances settled");
        Ok(written)
    }

    /// Record one completed payment between two members
    pub async fn settle_single(
        &self,
        group_id: GroupId,
        request: SingleSettlement,
    ) -> Result<SettlementRecord> {
        check_amount(request.amount)?;
        if request.from == request.to {
            return Err(Error::Validation(
                "Cannot settle with yourself".to_string(),
            ));
        }

        self.store
            .group(group_id)
            .await?
            .ok_or(Error::GroupNotFound(group_id))?;

        let settlement = Settlement::completed(request.from, request.to, request.amount);
        settlement.validate()?;

        let lock = self.group_lock(group_id);
        let inserted = {
            let _guard = lock.lock().await;
            let record = SettlementRecord::new(group_id, settlement, Utc::now());
            self.store
                .insert_settlement(record.clone())
                .await
                .map(|()| record)
        };
        drop(lock);
        self.release_group_lock(group_id);

        let record = inserted?;
        self.metrics.record_settlement();

        info!(
            group_id = %group_id,
            from = %record.settlement.from,
            to = %record.settlement.to,
            amount = %record.settlement.amount,
            "Settlement recorded"
        );
        Ok(record)
    }
}

impl SettlementService {
    fn group_lock(&self, group_id: GroupId) -> Arc<Mutex<()>> {
        self.group_locks.entry(group_id).or_default().clone()
    }

    /// Drop the group's lock once no caller holds a handle to it
    fn release_group_lock(&self, group_id: GroupId) {
        self.group_locks
            .remove_if(&group_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn evict_expired_replays(&self, now: DateTime<Utc>) {
        let before = self.replays.len();
        self.replays
            .retain(|_, replay| now - replay.stored_at < self.replay_ttl);
        let evicted = before.saturating_sub(self.replays.len());
        if evicted > 0 {
            debug!(evicted, "Expired settle-all replays dropped");
        }
    }
}

impl std::fmt::Debug for SettlementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementService")
            .field("replay_ttl", &self.replay_ttl)
            .field("locked_groups", &self.group_locks.len())
            .field("replays", &self.replays.len())
            .finish_non_exhaustive()
    }
}
