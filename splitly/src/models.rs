//! Stored records and response views

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_core::{Expense, Settlement, SettlementStatus, SplitKind, UserId};
use uuid::Uuid;

/// Group identifier
pub type GroupId = Uuid;

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,
}

impl User {
    /// Create user with a fresh ID
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(Uuid::new_v4().to_string()),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Member role within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Created the group
    Owner,
    /// Joined the group
    Member,
}

/// Group membership entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member
    pub user: UserId,

    /// Role
    pub role: MemberRole,

    /// Joined timestamp
    pub joined_at: DateTime<Utc>,
}

/// Kind of group, used only for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Travel
    #[default]
    Trip,
    /// Shared household
    House,
    /// Work or hobby project
    Project,
    /// Two people
    Couple,
    /// Anything else
    Other,
}

/// Expense-sharing group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Group ID
    pub id: GroupId,

    /// Name
    pub name: String,

    /// Kind
    pub kind: GroupKind,

    /// ISO 4217 currency code
    pub currency: String,

    /// Currency display symbol
    pub currency_symbol: String,

    /// Owner
    pub owner: UserId,

    /// Members in join order
    pub members: Vec<Member>,

    /// Archived groups accept no new expenses and get no reminders
    pub archived: bool,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last change timestamp
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Check membership
    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.iter().any(|m| &m.user == user)
    }

    /// Member IDs in join order
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user.clone()).collect()
    }
}

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Restaurants and takeaway
    Food,
    /// Local transport
    Transport,
    /// Groceries
    Groceries,
    /// Entertainment
    Entertainment,
    /// Utilities
    Utilities,
    /// Rent
    Rent,
    /// Travel
    Travel,
    /// Shopping
    Shopping,
    /// Anything else
    #[default]
    Other,
}

impl Category {
    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Category::Food => "Food & Dining",
            Category::Transport => "Transport",
            Category::Groceries => "Groceries",
            Category::Entertainment => "Entertainment",
            Category::Utilities => "Utilities",
            Category::Rent => "Rent",
            Category::Travel => "Travel",
            Category::Shopping => "Shopping",
            Category::Other => "Others",
        }
    }
}

/// Stored expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    /// Expense ID
    pub id: Uuid,

    /// Owning group
    pub group_id: GroupId,

    /// Description
    pub description: String,

    /// Category
    pub category: Category,

    /// How the expense was shared
    pub split_kind: SplitKind,

    /// Payer, amount and shares
    #[serde(flatten)]
    pub expense: Expense,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Stored settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRecord {
    /// Settlement ID
    pub id: Uuid,

    /// Owning group
    pub group_id: GroupId,

    /// Parties, amount and status
    #[serde(flatten)]
    pub settlement: Settlement,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Wrap a settlement for storage
    pub fn new(group_id: GroupId, settlement: Settlement, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            settlement,
            created_at,
        }
    }

    /// Status shortcut
    pub fn status(&self) -> SettlementStatus {
        self.settlement.status
    }
}

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Balance reminder
    Reminder,
    /// Group invitation
    Invite,
    /// System message
    System,
    /// Settlement recorded
    Settlement,
}

/// Extra data attached to a notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMetadata {
    /// Member who is owed
    pub creditor_id: Option<UserId>,

    /// Amount referenced
    pub amount: Option<Decimal>,

    /// Group name at the time of sending
    pub group_name: Option<String>,

    /// Sent by the automatic sweep
    pub is_auto: bool,
}

/// In-app notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification ID
    pub id: Uuid,

    /// Recipient
    pub user_id: UserId,

    /// Related group
    pub group_id: Option<GroupId>,

    /// Kind
    pub kind: NotificationKind,

    /// Message text
    pub message: String,

    /// Read flag
    pub is_read: bool,

    /// Extra data
    pub metadata: NotificationMetadata,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Member display record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    /// User ID
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Email address
    pub email: String,
}

impl MemberView {
    /// Placeholder for users missing from the directory
    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            name: "Unknown".to_string(),
            email: String::new(),
        }
    }
}

impl From<&User> for MemberView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
