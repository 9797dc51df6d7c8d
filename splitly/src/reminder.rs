//! Balance reminders
//!
//! The automatic sweep nudges every debtor at most once per group per UTC
//! day. Manual reminders are sent by a creditor and capped per day.

use crate::{
    config::ReminderConfig,
    ledger::{check_amount, GroupLedger},
    mailer::{Email, Mailer},
    metrics::Metrics,
    models::*,
    store::LedgerStore,
    Error, Result,
};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_core::UserId;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Creditor-initiated reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualReminder {
    /// Member being reminded
    pub debtor: UserId,

    /// Group the debt belongs to
    pub group: GroupId,

    /// Amount outstanding
    pub amount: Decimal,

    /// Custom message
    pub message: Option<String>,
}

/// Reminder service
pub struct ReminderService {
    store: Arc<dyn LedgerStore>,
    mailer: Arc<dyn Mailer>,
    config: ReminderConfig,
    metrics: Metrics,
}

impl ReminderService {
    /// Create new reminder service
    pub fn new(
        store: Arc<dyn LedgerStore>,
        mailer: Arc<dyn Mailer>,
        config: ReminderConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
            metrics,
        }
    }

    /// Nudge every debtor in every active group
    ///
    /// Returns the number of reminders sent.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let since = start_of_day(now);
        let mut nudges = 0;

        for group in self.store.active_groups().await? {
            let ledger = GroupLedger::for_group(self.store.as_ref(), group).await?;
            let transfers = ledger.transfers();
            self.metrics.record_optimization(transfers.len());

            for transfer in transfers {
                let already_sent = self
                    .store
                    .count_reminders_since(&transfer.from, ledger.group.id, None, since)
                    .await?;
                if already_sent > 0 {
                    debug!(group_id = %ledger.group.id, debtor = %transfer.from, "Already nudged today");
                    continue;
                }

                if !ledger.group.is_member(&transfer.from) || !ledger.group.is_member(&transfer.to) {
                    continue;
                }
                let (Some(debtor), Some(creditor)) = (
                    self.store.user(&transfer.from).await?,
                    self.store.user(&transfer.to).await?,
                ) else {
                    continue;
                };

                let group = &ledger.group;
                let message = format!(
                    "Smart Nudge: You still have a pending balance of {}{} with {} in {}.",
                    group.currency_symbol, transfer.amount, creditor.name, group.name
                );

                self.store
                    .insert_notification(Notification {
                        id: Uuid::new_v4(),
                        user_id: debtor.id.clone(),
                        group_id: Some(group.id),
                        kind: NotificationKind::Reminder,
                        message: message.clone(),
                        is_read: false,
                        metadata: NotificationMetadata {
                            creditor_id: Some(creditor.id.clone()),
                            amount: Some(transfer.amount),
                            group_name: Some(group.name.clone()),
                            is_auto: true,
                        },
                        created_at: now,
                    })
                    .await?;

                let email = Email {
                    from: self.config.sender.clone(),
                    to: debtor.email.clone(),
                    subject: format!("Splitly: Friendly nudge for {}", group.name),
                    body: format!(
                        "Hey {},\n\n{}\n\nView the group: {}\n",
                        debtor.name,
                        message,
                        self.group_link(group.id)
                    ),
                };
                if let Err(e) = self.mailer.send(&email).await {
                    warn!(debtor = %debtor.id, error = %e, "Reminder email failed");
                }

                self.metrics.record_reminder();
                nudges += 1;
            }
        }

        self.metrics.record_sweep();
        info!(nudges, "Reminder sweep complete");
        Ok(nudges)
    }

    /// Send a reminder on behalf of `creditor`
    pub async fn send_manual(
        &self,
        creditor_id: &UserId,
        request: ManualReminder,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        check_amount(request.amount)?;

        let sent_today = self
            .store
            .count_reminders_since(
                &request.debtor,
                request.group,
                Some(creditor_id),
                start_of_day(now),
            )
            .await?;
        if sent_today >= self.config.manual_daily_limit {
            return Err(Error::RateLimited(
                "Daily reminder limit reached for this user".to_string(),
            ));
        }

        let debtor = self
            .store
            .user(&request.debtor)
            .await?
            .ok_or_else(|| Error::UserNotFound(request.debtor.clone()))?;
        let creditor = self
            .store
            .user(creditor_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(creditor_id.clone()))?;
        let group = self
            .store
            .group(request.group)
            .await?
            .ok_or(Error::GroupNotFound(request.group))?;

        let message = request.message.unwrap_or_else(|| {
            format!(
                "Friendly nudge: You still owe {}{} in {}",
                group.currency_symbol, request.amount, group.name
            )
        });

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: debtor.id.clone(),
            group_id: Some(group.id),
            kind: NotificationKind::Reminder,
            message: message.clone(),
            is_read: false,
            metadata: NotificationMetadata {
                creditor_id: Some(creditor.id.clone()),
                amount: Some(request.amount),
                group_name: Some(group.name.clone()),
                is_auto: false,
            },
            created_at: now,
        };
        self.store.insert_notification(notification.clone()).await?;

        let email = Email {
            from: self.config.sender.clone(),
            to: debtor.email.clone(),
            subject: format!("Splitly reminder: Balance pending in {}", group.name),
            body: format!(
                "Hey {},\n\n{} sent you a reminder about your pending balance in {}.\n\n{}\n\nSettle up: {}\n",
                debtor.name,
                creditor.name,
                group.name,
                message,
                self.group_link(group.id)
            ),
        };
        if let Err(e) = self.mailer.send(&email).await {
            warn!(debtor = %debtor.id, error = %e, "Reminder email failed");
        }

        self.metrics.record_reminder();
        info!(group_id = %group.id, debtor = %debtor.id, creditor = %creditor.id, "Manual reminder sent");
        Ok(notification)
    }

    fn group_link(&self, group_id: GroupId) -> String {
        format!(
            "{}/groups/{}",
            self.config.app_base_url.trim_end_matches('/'),
            group_id
        )
    }
}

impl std::fmt::Debug for ReminderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Midnight UTC of the day containing `now`
pub(crate) fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now)
}
