//! Error types for the Splitly service layer

use crate::models::GroupId;
use settle_core::UserId;
use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger validation error
    #[error("Ledger error: {0}")]
    Core(#[from] settle_core::Error),

    /// Group does not exist
    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    /// User does not exist
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Caller is not a member of the group
    #[error("User {user} is not a member of group {group}")]
    NotMember {
        /// Caller
        user: UserId,
        /// Group
        group: GroupId,
    },

    /// Operation reserved for the group owner
    #[error("Only the owner can {0}")]
    NotOwner(String),

    /// Group no longer accepts changes
    #[error("Group is archived: {0}")]
    GroupArchived(GroupId),

    /// Too many requests in the current window
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Invalid request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage backend error
    #[error("Store error: {0}")]
    Store(String),

    /// Mail delivery error
    #[error("Mail error: {0}")]
    Mail(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
