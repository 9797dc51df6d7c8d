//! Splitly
//!
//! Shared-expense groups with optimized settle-up.
//!
//! # Architecture
//!
//! Every balance view is rebuilt from the stored ledger on demand:
//!
//! 1. **Recording**: expenses are validated and split across members
//! 2. **Balances**: [`settle_core`] turns expenses and completed settlements
//!    into the fewest suggested transfers
//! 3. **Settling**: settle-all writes one completed settlement per transfer,
//!    serialized per group and replay-safe under an idempotency key
//! 4. **Reminders**: a scheduled sweep nudges debtors once per day
//!
//! # Example
//!
//! ```no_run
//! use splitly::{Config, InMemoryStore, LogMailer, Splitly};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> splitly::Result<()> {
//!     let app = Splitly::new(
//!         Config::default(),
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(LogMailer),
//!     )?;
//!
//!     let owner = app.register_user("Asha", "asha@example.com").await?;
//!     let group = app
//!         .groups
//!         .create_group(&owner.id, splitly::NewGroup {
//!             name: "Goa trip".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     let overview = app.settlements.overview(group.id).await?;
//!     println!("{} transfers pending", overview.pending_count);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod expenses;
pub mod groups;
pub mod inbox;
pub mod insights;
pub mod ledger;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod reminder;
pub mod scheduler;
pub mod settlements;
pub mod store;

// Re-exports
pub use config::{Config, GroupDefaults, ReminderConfig, SettlementConfig};
pub use error::{Error, Result};
pub use expenses::{ExpenseService, NewExpense};
pub use groups::{GroupDetail, GroupService, GroupSummary, MemberBalance, NewGroup};
pub use inbox::NotificationInbox;
pub use insights::{Insights, InsightsService};
pub use ledger::{BalanceSummary, GroupLedger};
pub use mailer::{Email, LogMailer, Mailer, MemoryMailer};
pub use metrics::Metrics;
pub use models::*;
pub use reminder::{ManualReminder, ReminderService};
pub use scheduler::{ReminderScheduler, Schedule};
pub use settlements::{SettlementOverview, SettlementService, SingleSettlement, TransferView};
pub use store::{InMemoryStore, LedgerStore};

use std::sync::Arc;
use tracing::info;

/// Application services over one store
pub struct Splitly {
    /// Groups and balance views
    pub groups: GroupService,

    /// Expense recording
    pub expenses: ExpenseService,

    /// Settle-up
    pub settlements: Arc<SettlementService>,

    /// Automatic and manual reminders
    pub reminders: Arc<ReminderService>,

    /// Notification inbox
    pub inbox: NotificationInbox,

    /// Spending insights
    pub insights: InsightsService,

    store: Arc<dyn LedgerStore>,
    metrics: Metrics,
    config: Config,
}

impl Splitly {
    /// Wire all services
    pub fn new(
        config: Config,
        store: Arc<dyn LedgerStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let metrics = Metrics::new()?;

        let groups = GroupService::new(store.clone(), config.groups.clone(), metrics.clone());
        let expenses = ExpenseService::new(store.clone());
        let settlements = Arc::new(
            SettlementService::new(store.clone(), metrics.clone())
                .with_replay_ttl(config.settlements.replay_ttl()),
        );
        let reminders = Arc::new(ReminderService::new(
            store.clone(),
            mailer,
            config.reminder.clone(),
            metrics.clone(),
        ));
        let inbox = NotificationInbox::new(store.clone());
        let insights = InsightsService::new(store.clone());

        info!(service = %config.service_name, version = %config.service_version, "Splitly services ready");

        Ok(Self {
            groups,
            expenses,
            settlements,
            reminders,
            inbox,
            insights,
            store,
            metrics,
            config,
        })
    }

    /// Store a new user
    pub async fn register_user(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<User> {
        let user = User::new(name, email);
        self.store.insert_user(user.clone()).await?;
        Ok(user)
    }

    /// Scheduler driving the reminder sweep
    pub fn scheduler(&self) -> Result<ReminderScheduler> {
        ReminderScheduler::new(&self.config.reminder, self.reminders.clone())
    }

    /// Metrics registry
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl std::fmt::Debug for Splitly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Splitly")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
