//! Ledger storage
//!
//! The service reads and writes records only through [`LedgerStore`].
//! [`InMemoryStore`] keeps everything in process and is what the server
//! binary and the tests run against.

use crate::{models::*, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use settle_core::{SettlementStatus, UserId};
use uuid::Uuid;

/// Storage port for users, groups and the group ledger
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert or replace a user
    async fn insert_user(&self, user: User) -> Result<()>;

    /// Look up a user
    async fn user(&self, id: &UserId) -> Result<Option<User>>;

    /// Insert a new group
    async fn insert_group(&self, group: Group) -> Result<()>;

    /// Replace an existing group
    async fn update_group(&self, group: Group) -> Result<()>;

    /// Look up a group
    async fn group(&self, id: GroupId) -> Result<Option<Group>>;

    /// Groups the user belongs to, most recently updated first
    async fn groups_for_member(&self, user: &UserId) -> Result<Vec<Group>>;

    /// Groups that are not archived
    async fn active_groups(&self) -> Result<Vec<Group>>;

    /// Append an expense
    async fn insert_expense(&self, expense: ExpenseRecord) -> Result<()>;

    /// Expenses of a group in insertion order
    async fn expenses_for_group(&self, group: GroupId) -> Result<Vec<ExpenseRecord>>;

    /// Append a settlement
    async fn insert_settlement(&self, settlement: SettlementRecord) -> Result<()>;

    /// Settlements of a group in insertion order, optionally filtered by status
    async fn settlements_for_group(
        &self,
        group: GroupId,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<SettlementRecord>>;

    /// Append a notification
    async fn insert_notification(&self, notification: Notification) -> Result<()>;

    /// Newest notifications for a user
    async fn notifications_for(&self, user: &UserId, limit: usize) -> Result<Vec<Notification>>;

    /// Reminders sent to `debtor` in `group` since `since`, optionally only
    /// those on behalf of `creditor`
    async fn count_reminders_since(
        &self,
        debtor: &UserId,
        group: GroupId,
        creditor: Option<&UserId>,
        since: DateTime<Utc>,
    ) -> Result<usize>;

    /// Mark one notification read; false if it does not belong to `user`
    async fn mark_read(&self, user: &UserId, id: Uuid) -> Result<bool>;

    /// Mark every unread notification of `user` read
    async fn mark_all_read(&self, user: &UserId) -> Result<usize>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: DashMap<UserId, User>,
    groups: DashMap<GroupId, Group>,
    expenses: RwLock<Vec<ExpenseRecord>>,
    settlements: RwLock<Vec<SettlementRecord>>,
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<()> {
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        if self.groups.contains_key(&group.id) {
            return Err(Error::Store(format!("Group {} already exists", group.id)));
        }
        self.groups.insert(group.id, group);
        Ok(())
    }

    async fn update_group(&self, group: Group) -> Result<()> {
        match self.groups.get_mut(&group.id) {
            Some(mut existing) => {
                *existing = group;
                Ok(())
            }
            None => Err(Error::GroupNotFound(group.id)),
        }
    }

    async fn group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.groups.get(&id).map(|g| g.value().clone()))
    }

    async fn groups_for_member(&self, user: &UserId) -> Result<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|g| g.is_member(user))
            .map(|g| g.value().clone())
            .collect();
        groups.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn active_groups(&self) -> Result<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|g| !g.archived)
            .map(|g| g.value().clone())
            .collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn insert_expense(&self, expense: ExpenseRecord) -> Result<()> {
        self.expenses.write().push(expense);
        Ok(())
    }

    async fn expenses_for_group(&self, group: GroupId) -> Result<Vec<ExpenseRecord>> {
        Ok(self
            .expenses
            .read()
            .iter()
            .filter(|e| e.group_id == group)
            .cloned()
            .collect())
    }

    async fn insert_settlement(&self, settlement: SettlementRecord) -> Result<()> {
        self.settlements.write().push(settlement);
        Ok(())
    }

    async fn settlements_for_group(
        &self,
        group: GroupId,
        status: Option<SettlementStatus>,
    ) -> Result<Vec<SettlementRecord>> {
        Ok(self
            .settlements
            .read()
            .iter()
            .filter(|s| s.group_id == group)
            .filter(|s| status.map_or(true, |wanted| s.status() == wanted))
            .cloned()
            .collect())
    }

    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        self.notifications.write().push(notification);
        Ok(())
    }

    async fn notifications_for(&self, user: &UserId, limit: usize) -> Result<Vec<Notification>> {
        let mut found: Vec<Notification> = self
            .notifications
            .read()
            .iter()
            .filter(|n| &n.user_id == user)
            .cloned()
            .collect();
        // newest first; later inserts win timestamp ties
        found.reverse();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        Ok(found)
    }

    async fn count_reminders_since(
        &self,
        debtor: &UserId,
        group: GroupId,
        creditor: Option<&UserId>,
        since: DateTime<Utc>,
    ) -> Result<usize> {
        Ok(self
            .notifications
            .read()
            .iter()
            .filter(|n| n.kind == NotificationKind::Reminder)
            .filter(|n| &n.user_id == debtor && n.group_id == Some(group))
            .filter(|n| n.created_at >= since)
            .filter(|n| creditor.map_or(true, |c| n.metadata.creditor_id.as_ref() == Some(c)))
            .count())
    }

    async fn mark_read(&self, user: &UserId, id: Uuid) -> Result<bool> {
        let mut notifications = self.notifications.write();
        match notifications
            .iter_mut()
            .find(|n| n.id == id && &n.user_id == user)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user: &UserId) -> Result<usize> {
        let mut updated = 0;
        for notification in self
            .notifications
            .write()
            .iter_mut()
            .filter(|n| &n.user_id == user && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use settle_core::Settlement;

    fn group_with(owner: &User, updated_at: DateTime<Utc>) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: "Trip".to_string(),
            kind: GroupKind::Trip,
            currency: "INR".to_string(),
            currency_symbol: "₹".to_string(),
            owner: owner.id.clone(),
            members: vec![Member {
                user: owner.id.clone(),
                role: MemberRole::Owner,
                joined_at: updated_at,
            }],
            archived: false,
            created_at: updated_at,
            updated_at,
        }
    }

    #[tokio::test]
    async fn test_groups_for_member_sorted_by_update() {
        let store = InMemoryStore::new();
        let owner = User::new("Asha", "asha@example.com");
        let older = group_with(&owner, Utc::now() - chrono::Duration::hours(2));
        let newer = group_with(&owner, Utc::now());
        store.insert_group(older.clone()).await.unwrap();
        store.insert_group(newer.clone()).await.unwrap();

        let groups = store.groups_for_member(&owner.id).await.unwrap();
        assert_eq!(groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let stranger = UserId::new("nobody");
        assert!(store.groups_for_member(&stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_group_rejected() {
        let store = InMemoryStore::new();
        let owner = User::new("Asha", "asha@example.com");
        let group = group_with(&owner, Utc::now());
        store.insert_group(group.clone()).await.unwrap();

        assert!(matches!(store.insert_group(group).await, Err(Error::Store(_))));
    }

    #[tokio::test]
    async fn test_settlement_status_filter() {
        let store = InMemoryStore::new();
        let group = Uuid::new_v4();
        let a = UserId::new("a");
        let b = UserId::new("b");
        store
            .insert_settlement(SettlementRecord::new(
                group,
                Settlement::completed(a.clone(), b.clone(), Decimal::from(5)),
                Utc::now(),
            ))
            .await
            .unwrap();
        store
            .insert_settlement(SettlementRecord::new(
                group,
                Settlement::pending(a, b, Decimal::from(7)),
                Utc::now(),
            ))
            .await
            .unwrap();

        let completed = store
            .settlements_for_group(group, Some(SettlementStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].settlement.amount, Decimal::from(5));
        assert_eq!(store.settlements_for_group(group, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_respects_owner() {
        let store = InMemoryStore::new();
        let owner = UserId::new("owner");
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: owner.clone(),
            group_id: None,
            kind: NotificationKind::System,
            message: "hello".to_string(),
            is_read: false,
            metadata: NotificationMetadata::default(),
            created_at: Utc::now(),
        };
        let id = notification.id;
        store.insert_notification(notification).await.unwrap();

        assert!(!store.mark_read(&UserId::new("intruder"), id).await.unwrap());
        assert!(store.mark_read(&owner, id).await.unwrap());
        assert_eq!(store.mark_all_read(&owner).await.unwrap(), 0);
    }
}
