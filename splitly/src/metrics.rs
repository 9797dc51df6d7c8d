//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `splitly_settle_all_total` - Settle-all requests that wrote records
//! - `splitly_settlements_written_total` - Settlement records written
//! - `splitly_reminders_sent_total` - Reminder notifications created
//! - `splitly_reminder_sweeps_total` - Completed reminder sweeps
//! - `splitly_optimizer_transfers` - Histogram of transfers per optimization

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Settle-all requests that wrote records
    pub settle_all_total: IntCounter,

    /// Settlement records written
    pub settlements_written: IntCounter,

    /// Reminder notifications created
    pub reminders_sent: IntCounter,

    /// Completed reminder sweeps
    pub reminder_sweeps: IntCounter,

    /// Transfers per optimization
    pub optimizer_transfers: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector on a private registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let settle_all_total = IntCounter::new(
            "splitly_settle_all_total",
            "Settle-all requests that wrote records",
        )?;
        registry.register(Box::new(settle_all_total.clone()))?;

        let settlements_written = IntCounter::new(
            "splitly_settlements_written_total",
            "Settlement records written",
        )?;
        registry.register(Box::new(settlements_written.clone()))?;

        let reminders_sent = IntCounter::new(
            "splitly_reminders_sent_total",
            "Reminder notifications created",
        )?;
        registry.register(Box::new(reminders_sent.clone()))?;

        let reminder_sweeps = IntCounter::new(
            "splitly_reminder_sweeps_total",
            "Completed reminder sweeps",
        )?;
        registry.register(Box::new(reminder_sweeps.clone()))?;

        let optimizer_transfers = Histogram::with_opts(
            HistogramOpts::new(
                "splitly_optimizer_transfers",
                "Transfers produced per optimization",
            )
            .buckets(vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]),
        )?;
        registry.register(Box::new(optimizer_transfers.clone()))?;

        Ok(Self {
            settle_all_total,
            settlements_written,
            reminders_sent,
            reminder_sweeps,
            optimizer_transfers,
            registry,
        })
    }

    /// Record an optimizer run
    pub fn record_optimization(&self, transfers: usize) {
        self.optimizer_transfers.observe(transfers as f64);
    }

    /// Record a settle-all that wrote `written` records
    pub fn record_settle_all(&self, written: usize) {
        self.settle_all_total.inc();
        self.settlements_written.inc_by(written as u64);
    }

    /// Record a single settlement write
    pub fn record_settlement(&self) {
        self.settlements_written.inc();
    }

    /// Record a reminder
    pub fn record_reminder(&self) {
        self.reminders_sent.inc();
    }

    /// Record a finished sweep
    pub fn record_sweep(&self) {
        self.reminder_sweeps.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("settle_all_total", &self.settle_all_total.get())
            .field("settlements_written", &self.settlements_written.get())
            .field("reminders_sent", &self.reminders_sent.get())
            .field("reminder_sweeps", &self.reminder_sweeps.get())
            .finish_non_exhaustive()
    }
}
