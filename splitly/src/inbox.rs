//! Per-user notification inbox

use crate::{models::Notification, store::LedgerStore, Result};
use settle_core::UserId;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Most notifications returned by [`NotificationInbox::list`]
pub const INBOX_LIMIT: usize = 50;

/// Read side of notifications
#[derive(Clone)]
pub struct NotificationInbox {
    store: Arc<dyn LedgerStore>,
}

impl NotificationInbox {
    /// Create new inbox
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Newest notifications of `user`
    pub async fn list(&self, user: &UserId) -> Result<Vec<Notification>> {
        self.store.notifications_for(user, INBOX_LIMIT).await
    }

    /// Number of unread notifications in the visible window
    pub async fn unread_count(&self, user: &UserId) -> Result<usize> {
        Ok(self.list(user).await?.iter().filter(|n| !n.is_read).count())
    }

    /// Mark one notification read
    ///
    /// Returns false when the notification does not exist or belongs to
    /// someone else.
    pub async fn mark_read(&self, user: &UserId, id: Uuid) -> Result<bool> {
        let updated = self.store.mark_read(user, id).await?;
        debug!(user = %user, %id, updated, "Mark notification read");
        Ok(updated)
    }

    /// Mark every notification of `user` read
    pub async fn mark_all_read(&self, user: &UserId) -> Result<usize> {
        let updated = self.store.mark_all_read(user).await?;
        debug!(user = %user, updated, "Mark all notifications read");
        Ok(updated)
    }
}

impl std::fmt::Debug for NotificationInbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationInbox").finish_non_exhaustive()
    }
}
