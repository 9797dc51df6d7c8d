//! Outgoing email
//!
//! Delivery is a collaborator: the service only composes messages and hands
//! them to a [`Mailer`].

use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Composed email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Sender address
    pub from: String,

    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Plain-text body
    pub body: String,
}

/// Mail delivery port
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one email
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Writes emails to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email queued");
        Ok(())
    }
}

/// Keeps sent emails in memory
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    /// Create empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails sent so far
    pub fn sent(&self) -> Vec<Email> {
        self.outbox.lock().clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        self.outbox.lock().push(email.clone());
        Ok(())
    }
}
