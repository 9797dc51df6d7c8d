//! Integration tests for Splitly
//!
//! Drives the service layer end-to-end over the in-memory store:
//! - Expense recording and equal splits
//! - Group summaries and detail views
//! - Settle-all idempotency and concurrency
//! - Reminder sweep and manual reminders
//! - Insights

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use settle_core::{Split, SplitKind, UserId};
use splitly::*;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

struct TestEnvironment {
    app: Splitly,
    mailer: Arc<MemoryMailer>,
    asha: User,
    ben: User,
    chen: User,
    group: Group,
}

impl TestEnvironment {
    /// Three registered members in one group
    async fn new() -> Self {
        let mailer = Arc::new(MemoryMailer::new());
        let app = Splitly::new(
            Config::default(),
            Arc::new(InMemoryStore::new()),
            mailer.clone(),
        )
        .unwrap();

        let asha = app.register_user("Asha", "asha@example.com").await.unwrap();
        let ben = app.register_user("Ben", "ben@example.com").await.unwrap();
        let chen = app.register_user("Chen", "chen@example.com").await.unwrap();

        let group = app
            .groups
            .create_group(
                &asha.id,
                NewGroup {
                    name: "Goa trip".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        app.groups.join(&ben.id, group.id).await.unwrap();
        let group = app.groups.join(&chen.id, group.id).await.unwrap();

        Self {
            app,
            mailer,
            asha,
            ben,
            chen,
            group,
        }
    }

    async fn spend(&self, payer: &User, description: &str, amount: &str) -> ExpenseRecord {
        self.app
            .expenses
            .add_expense(
                &payer.id,
                NewExpense {
                    group_id: self.group.id,
                    description: description.to_string(),
                    amount: dec(amount),
                    category: Category::Food,
                    paid_by: None,
                    split_kind: SplitKind::Equal,
                    splits: Vec::new(),
                },
            )
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_equal_split_gives_remainder_to_first_member() {
    let env = TestEnvironment::new().await;

    let record = env.spend(&env.ben, "Dinner", "100").await;
    let splits = &record.expense.splits;

    assert_eq!(splits.len(), 3);
    assert_eq!(splits[0].user, env.asha.id);
    assert_eq!(splits[0].amount, dec("33.34"));
    assert_eq!(splits[1].amount, dec("33.33"));
    assert_eq!(splits[2].amount, dec("33.33"));
    assert_eq!(record.split_kind, SplitKind::Equal);
}

#[tokio::test]
async fn test_custom_split_must_match_amount() {
    let env = TestEnvironment::new().await;

    let result = env
        .app
        .expenses
        .add_expense(
            &env.asha.id,
            NewExpense {
                group_id: env.group.id,
                description: "Taxi".to_string(),
                amount: dec("50"),
                category: Category::Transport,
                paid_by: None,
                split_kind: SplitKind::Custom,
                splits: vec![
                    Split::new(env.asha.id.clone(), dec("20")),
                    Split::new(env.ben.id.clone(), dec("20")),
                ],
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(Error::Core(settle_core::Error::SplitMismatch { .. }))
    ));
}

#[tokio::test]
async fn test_non_member_cannot_add_expense() {
    let env = TestEnvironment::new().await;
    let stranger = env.app.register_user("Dev", "dev@example.com").await.unwrap();

    let result = env
        .app
        .expenses
        .add_expense(
            &stranger.id,
            NewExpense {
                group_id: env.group.id,
                description: "Snacks".to_string(),
                amount: dec("10"),
                category: Category::Other,
                paid_by: None,
                split_kind: SplitKind::Equal,
                splits: Vec::new(),
            },
        )
        .await;

    assert!(matches!(result, Err(Error::NotMember { .. })));
}

#[tokio::test]
async fn test_summaries_and_detail() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;
    env.spend(&env.ben, "Lunch", "30").await;

    let summaries = env.app.groups.summaries_for(&env.chen.id).await.unwrap();
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.expense_count, 2);
    assert_eq!(summary.balance.you_owe, dec("40"));
    assert_eq!(summary.balance.total_spend, dec("120"));
    assert!(!summary.balance.is_settled);
    assert_eq!(
        summary.last_activity.as_ref().map(|a| a.description.as_str()),
        Some("Lunch")
    );

    let detail = env.app.groups.detail(&env.asha.id, env.group.id).await.unwrap();
    assert_eq!(detail.expenses[0].description, "Lunch");
    assert_eq!(detail.balance.you_are_owed, dec("50"));
    let asha = &detail.member_balances[&env.asha.id];
    assert_eq!(asha.paid, dec("90"));
    assert_eq!(asha.owes, dec("40"));
    assert_eq!(asha.net, dec("50"));

    let transfers: HashSet<(UserId, UserId, Decimal)> = detail
        .optimized_transfers
        .iter()
        .map(|t| (t.from.clone(), t.to.clone(), t.amount))
        .collect();
    assert_eq!(
        transfers,
        HashSet::from([
            (env.ben.id.clone(), env.asha.id.clone(), dec("10")),
            (env.chen.id.clone(), env.asha.id.clone(), dec("40")),
        ])
    );
}

#[tokio::test]
async fn test_detail_requires_membership() {
    let env = TestEnvironment::new().await;
    let stranger = env.app.register_user("Dev", "dev@example.com").await.unwrap();

    let result = env.app.groups.detail(&stranger.id, env.group.id).await;
    assert!(matches!(result, Err(Error::NotMember { .. })));
}

#[tokio::test]
async fn test_overview_context_and_unknown_member() {
    let env = TestEnvironment::new().await;
    let ghost = UserId::new("ghost");
    env.app.groups.join(&ghost, env.group.id).await.unwrap();

    env.spend(&env.asha, "Beach shack", "80").await;
    env.spend(&env.asha, "Scooter rental", "40").await;

    let overview = env.app.settlements.overview(env.group.id).await.unwrap();
    assert_eq!(overview.pending_count, 3);
    assert_eq!(overview.total_to_settle, dec("90"));
    assert_eq!(overview.currency_symbol, "₹");

    for transfer in &overview.transfers {
        assert_eq!(transfer.to.name, "Asha");
        assert_eq!(transfer.context, "Beach shack");
    }
    let ghost_view = overview
        .transfers
        .iter()
        .find(|t| t.from.id == ghost)
        .unwrap();
    assert_eq!(ghost_view.from.name, "Unknown");
}

#[tokio::test]
async fn test_settle_all_is_idempotent_per_key() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    let first = env
        .app
        .settlements
        .settle_all(env.group.id, Some("req-1"))
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|s| s.status() == settle_core::SettlementStatus::Completed));

    env.spend(&env.ben, "Breakfast", "30").await;

    let replay = env
        .app
        .settlements
        .settle_all(env.group.id, Some("req-1"))
        .await
        .unwrap();
    assert_eq!(
        replay.iter().map(|s| s.id).collect::<Vec<_>>(),
        first.iter().map(|s| s.id).collect::<Vec<_>>()
    );

    let fresh = env
        .app
        .settlements
        .settle_all(env.group.id, Some("req-2"))
        .await
        .unwrap();
    assert_eq!(fresh.len(), 2);

    let detail = env.app.groups.detail(&env.ben.id, env.group.id).await.unwrap();
    assert!(detail.balance.is_settled);
    assert!(detail.optimized_transfers.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_settle_all_writes_once() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let settlements = env.app.settlements.clone();
        let group_id = env.group.id;
        handles.push(tokio::spawn(async move {
            settlements.settle_all(group_id, None).await.unwrap().len()
        }));
    }

    let mut written = 0;
    for handle in handles {
        written += handle.await.unwrap();
    }
    assert_eq!(written, 2);

    let overview = env.app.settlements.overview(env.group.id).await.unwrap();
    assert_eq!(overview.pending_count, 0);
}

#[tokio::test]
async fn test_single_settlement_reduces_balance() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    env.app
        .settlements
        .settle_single(
            env.group.id,
            SingleSettlement {
                from: env.ben.id.clone(),
                to: env.asha.id.clone(),
                amount: dec("30"),
            },
        )
        .await
        .unwrap();

    let overview = env.app.settlements.overview(env.group.id).await.unwrap();
    assert_eq!(overview.pending_count, 1);
    assert_eq!(overview.transfers[0].from.id, env.chen.id);

    let invalid = env
        .app
        .settlements
        .settle_single(
            env.group.id,
            SingleSettlement {
                from: env.ben.id.clone(),
                to: env.ben.id.clone(),
                amount: dec("5"),
            },
        )
        .await;
    assert!(matches!(invalid, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_reminder_sweep_once_per_day() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    let now = Utc::now();
    assert_eq!(env.app.reminders.sweep(now).await.unwrap(), 2);
    assert_eq!(env.app.reminders.sweep(now).await.unwrap(), 0);
    assert_eq!(env.app.reminders.sweep(now + Duration::days(1)).await.unwrap(), 2);

    let inbox = env.app.inbox.list(&env.ben.id).await.unwrap();
    assert_eq!(inbox.len(), 2);
    let nudge = &inbox[0];
    assert_eq!(nudge.kind, NotificationKind::Reminder);
    assert!(nudge.message.starts_with("Smart Nudge: You still have a pending balance of ₹"));
    assert!(nudge.message.ends_with("with Asha in Goa trip."));
    assert_eq!(nudge.metadata.creditor_id.as_ref(), Some(&env.asha.id));
    assert!(nudge.metadata.is_auto);

    let sent = env.mailer.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent
        .iter()
        .all(|e| e.body.contains(&format!("/groups/{}", env.group.id))));
}

#[tokio::test]
async fn test_reminder_sweep_skips_archived_groups() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    let not_owner = env.app.groups.archive(&env.ben.id, env.group.id).await;
    assert!(matches!(not_owner, Err(Error::NotOwner(_))));

    env.app.groups.archive(&env.asha.id, env.group.id).await.unwrap();
    assert_eq!(env.app.reminders.sweep(Utc::now()).await.unwrap(), 0);
    assert!(env.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_manual_reminder_daily_limit() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    let now = Utc::now();
    let request = ManualReminder {
        debtor: env.ben.id.clone(),
        group: env.group.id,
        amount: dec("30"),
        message: None,
    };

    let limit = env.app.config().reminder.manual_daily_limit;
    for _ in 0..limit {
        env.app
            .reminders
            .send_manual(&env.asha.id, request.clone(), now)
            .await
            .unwrap();
    }

    let blocked = env
        .app
        .reminders
        .send_manual(&env.asha.id, request.clone(), now)
        .await;
    assert!(matches!(blocked, Err(Error::RateLimited(_))));

    // Another creditor has its own allowance
    let from_chen = env
        .app
        .reminders
        .send_manual(&env.chen.id, request.clone(), now)
        .await
        .unwrap();
    assert_eq!(from_chen.message, "Friendly nudge: You still owe ₹30 in Goa trip");
    assert!(!from_chen.metadata.is_auto);

    // Allowance resets the next day
    env.app
        .reminders
        .send_manual(&env.asha.id, request, now + Duration::days(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_inbox_mark_read() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;
    env.app.reminders.sweep(Utc::now()).await.unwrap();

    let inbox = env.app.inbox.list(&env.chen.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(!env.app.inbox.mark_read(&env.ben.id, inbox[0].id).await.unwrap());
    assert!(env.app.inbox.mark_read(&env.chen.id, inbox[0].id).await.unwrap());
    assert_eq!(env.app.inbox.unread_count(&env.chen.id).await.unwrap(), 0);
    assert_eq!(env.app.inbox.mark_all_read(&env.ben.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_insights_for_member() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    let insights = env
        .app
        .insights
        .for_user(&env.ben.id, None, Utc::now())
        .await
        .unwrap();

    assert_eq!(insights.total_spent, dec("90"));
    assert_eq!(insights.your_share, dec("30"));
    assert_eq!(insights.share_percentage, dec("33.3"));
    assert_eq!(insights.month_change, 0);
    assert_eq!(insights.fairness_score, 33);
    assert_eq!(insights.categories.len(), 1);
    assert_eq!(insights.categories[0].name, "Food & Dining");
    assert_eq!(insights.group_tabs.len(), 1);

    let filtered = env
        .app
        .insights
        .for_user(&env.ben.id, Some(uuid::Uuid::new_v4()), Utc::now())
        .await
        .unwrap();
    assert!(filtered.group_tabs.is_empty());
    assert_eq!(filtered.fairness_score, 100);
}

#[tokio::test]
async fn test_views_serialize_camel_case() {
    let env = TestEnvironment::new().await;
    env.spend(&env.asha, "Hotel", "90").await;

    let summary = &env.app.groups.summaries_for(&env.ben.id).await.unwrap()[0];
    let json = serde_json::to_value(summary).unwrap();
    assert!(json["balance"].get("youOwe").is_some());
    assert!(json.get("expenseCount").is_some());

    let overview = env.app.settlements.overview(env.group.id).await.unwrap();
    let json = serde_json::to_value(&overview).unwrap();
    assert!(json.get("totalToSettle").is_some());
    assert_eq!(json["transfers"][0]["to"]["name"], "Asha");
}

#[tokio::test]
async fn test_amounts_above_limit_are_rejected() {
    let env = TestEnvironment::new().await;
    let too_big = settle_core::MAX_AMOUNT + Decimal::ONE;

    let expense = env
        .app
        .expenses
        .add_expense(
            &env.asha.id,
            NewExpense {
                group_id: env.group.id,
                description: "Villa".to_string(),
                amount: too_big,
                category: Category::Rent,
                paid_by: None,
                split_kind: SplitKind::Equal,
                splits: Vec::new(),
            },
        )
        .await;
    assert!(matches!(expense, Err(Error::Validation(_))));

    let settlement = env
        .app
        .settlements
        .settle_single(
            env.group.id,
            SingleSettlement {
                from: env.ben.id.clone(),
                to: env.asha.id.clone(),
                amount: too_big,
            },
        )
        .await;
    assert!(matches!(settlement, Err(Error::Validation(_))));

    let reminder = env
        .app
        .reminders
        .send_manual(
            &env.asha.id,
            ManualReminder {
                debtor: env.ben.id.clone(),
                group: env.group.id,
                amount: too_big,
                message: None,
            },
            Utc::now(),
        )
        .await;
    assert!(matches!(reminder, Err(Error::Validation(_))));

    let overview = env.app.settlements.overview(env.group.id).await.unwrap();
    assert_eq!(overview.pending_count, 0);
}

#[tokio::test]
async fn test_oversized_stored_expenses_do_not_break_views() {
    let store = Arc::new(InMemoryStore::new());
    let app = Splitly::new(Config::default(), store.clone(), Arc::new(MemoryMailer::new())).unwrap();
    let asha = app.register_user("Asha", "asha@example.com").await.unwrap();
    let ben = app.register_user("Ben", "ben@example.com").await.unwrap();
    let group = app
        .groups
        .create_group(
            &asha.id,
            NewGroup {
                name: "Legacy".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    app.groups.join(&ben.id, group.id).await.unwrap();

    // Records written before amounts were capped
    let huge = dec("50000000000000000000000000000");
    for _ in 0..2 {
        store
            .insert_expense(ExpenseRecord {
                id: uuid::Uuid::new_v4(),
                group_id: group.id,
                description: "Imported".to_string(),
                category: Category::Other,
                split_kind: SplitKind::Custom,
                expense: settle_core::Expense::new(
                    asha.id.clone(),
                    huge,
                    vec![Split::new(ben.id.clone(), huge)],
                ),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    let summaries = app.groups.summaries_for(&asha.id).await.unwrap();
    assert_eq!(summaries[0].balance.total_spend, Decimal::MAX);
    assert_eq!(summaries[0].balance.you_are_owed, Decimal::MAX);

    let detail = app.groups.detail(&ben.id, group.id).await.unwrap();
    assert_eq!(detail.optimized_transfers.len(), 1);

    let overview = app.settlements.overview(group.id).await.unwrap();
    assert_eq!(overview.total_to_settle, Decimal::MAX);

    assert_eq!(app.reminders.sweep(Utc::now()).await.unwrap(), 1);
    app.insights.for_user(&asha.id, None, Utc::now()).await.unwrap();
}
