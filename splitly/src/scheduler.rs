//! Reminder scheduler
//!
//! Runs the reminder sweep at configured times of day (UTC):
//! - Default: once per day at 09:00
//! - Ad-hoc: `trigger_now` for ops and tests

use crate::{config::ReminderConfig, reminder::ReminderService, Error, Result};
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Tolerance around a scheduled time, in seconds
const RUN_TOLERANCE_SECS: i64 = 60;

/// Minimum gap between two scheduled runs, in seconds
const MIN_RUN_GAP_SECS: i64 = 120;

/// Parsed reminder times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    times: Vec<NaiveTime>,
}

impl Schedule {
    /// Parse `HH:MM` times
    pub fn parse(times: &[String]) -> Result<Self> {
        let mut parsed = times
            .iter()
            .map(|time_str| {
                NaiveTime::parse_from_str(time_str, "%H:%M").map_err(|e| {
                    Error::Config(format!("Invalid time format '{}': {}", time_str, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if parsed.is_empty() {
            return Err(Error::Config("No reminder times configured".to_string()));
        }

        parsed.sort();
        parsed.dedup();
        Ok(Self { times: parsed })
    }

    /// Scheduled times in ascending order
    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    /// Next scheduled run strictly after `now`
    pub fn next_run_time(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let current_time = now.time();

        if let Some(time) = self.times.iter().find(|t| current_time < **t) {
            return now
                .date_naive()
                .and_time(*time)
                .and_local_timezone(Utc)
                .single()
                .ok_or_else(|| Error::Config("Invalid timezone conversion".to_string()));
        }

        // No more runs today
        let tomorrow = (now + Duration::days(1)).date_naive();
        let first = self
            .times
            .first()
            .ok_or_else(|| Error::Config("No reminder times configured".to_string()))?;

        tomorrow
            .and_time(*first)
            .and_local_timezone(Utc)
            .single()
            .ok_or_else(|| Error::Config("Invalid timezone conversion".to_string()))
    }

    /// Whether `now` is within a minute of a scheduled time
    pub fn is_run_time(&self, now: DateTime<Utc>) -> bool {
        let current = now.time().num_seconds_from_midnight() as i64;
        self.times.iter().any(|time| {
            let diff = (current - time.num_seconds_from_midnight() as i64).abs();
            // Wrap around midnight
            diff.min(86_400 - diff) < RUN_TOLERANCE_SECS
        })
    }
}

/// Periodic driver for [`ReminderService::sweep`]
pub struct ReminderScheduler {
    schedule: Schedule,
    check_interval: std::time::Duration,
    reminders: Arc<ReminderService>,
    last_run: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl ReminderScheduler {
    /// Create new scheduler
    pub fn new(config: &ReminderConfig, reminders: Arc<ReminderService>) -> Result<Self> {
        Ok(Self {
            schedule: Schedule::parse(&config.times)?,
            check_interval: std::time::Duration::from_secs(config.check_interval_secs.max(1)),
            reminders,
            last_run: Arc::new(RwLock::new(None)),
        })
    }

    /// Start scheduler loop
    pub async fn start(self: Arc<Self>) {
        info!(times = ?self.schedule.times(), "Starting reminder scheduler");

        let mut interval = tokio::time::interval(self.check_interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.check_schedule(Utc::now()).await {
                warn!("Reminder scheduler check failed: {}", e);
            }
        }
    }

    /// Run the sweep if `now` is a scheduled time not yet handled
    ///
    /// Returns the number of reminders sent, or `None` if nothing ran.
    pub async fn check_schedule(&self, now: DateTime<Utc>) -> Result<Option<usize>> {
        if !self.schedule.is_run_time(now) {
            return Ok(None);
        }

        {
            let mut last_run = self.last_run.write().await;
            if let Some(previous) = *last_run {
                if now - previous < Duration::seconds(MIN_RUN_GAP_SECS) {
                    debug!(%previous, "Reminder sweep already ran for this slot");
                    return Ok(None);
                }
            }
            *last_run = Some(now);
        }

        info!(%now, "Scheduled reminder sweep");
        self.reminders.sweep(now).await.map(Some)
    }

    /// Run the sweep immediately, ignoring the schedule
    pub async fn trigger_now(&self, requester: &str) -> Result<usize> {
        info!(requester, "Ad-hoc reminder sweep triggered");
        self.reminders.sweep(Utc::now()).await
    }

    /// Next scheduled run from the current time
    pub fn next_run_time(&self) -> Result<DateTime<Utc>> {
        self.schedule.next_run_time(Utc::now())
    }

    /// Time of the last scheduled run
    pub async fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.read().await
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("schedule", &self.schedule)
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mailer::MemoryMailer, metrics::Metrics, store::InMemoryStore};
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, h, m, s).unwrap()
    }

    fn schedule(times: &[&str]) -> Schedule {
        Schedule::parse(&times.iter().map(|t| t.to_string()).collect::<Vec<_>>()).unwrap()
    }

    fn scheduler(times: &[&str]) -> ReminderScheduler {
        let config = ReminderConfig {
            times: times.iter().map(|t| t.to_string()).collect(),
            ..ReminderConfig::default()
        };
        let reminders = ReminderService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(MemoryMailer::default()),
            config.clone(),
            Metrics::new().unwrap(),
        );
        ReminderScheduler::new(&config, Arc::new(reminders)).unwrap()
    }

    #[test]
    fn test_parse_sorts_times() {
        let schedule = schedule(&["18:00", "09:00"]);
        assert_eq!(schedule.times()[0].hour(), 9);
        assert_eq!(schedule.times()[1].hour(), 18);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Schedule::parse(&["25:00".to_string()]).is_err());
        assert!(Schedule::parse(&["nine".to_string()]).is_err());
        assert!(Schedule::parse(&[]).is_err());
    }

    #[test]
    fn test_next_run_later_today() {
        let next = schedule(&["09:00", "18:00"]).next_run_time(at(10, 0, 0)).unwrap();
        assert_eq!(next, at(18, 0, 0));
    }

    #[test]
    fn test_next_run_wraps_to_tomorrow() {
        let next = schedule(&["09:00"]).next_run_time(at(20, 0, 0)).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 5, 21, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_is_run_time_tolerance() {
        let schedule = schedule(&["09:00", "00:00"]);
        assert!(schedule.is_run_time(at(9, 0, 30)));
        assert!(schedule.is_run_time(at(8, 59, 1)));
        assert!(!schedule.is_run_time(at(9, 1, 0)));
        assert!(schedule.is_run_time(at(23, 59, 30)));
    }

    #[tokio::test]
    async fn test_check_schedule_runs_once_per_slot() {
        let scheduler = scheduler(&["09:00"]);

        assert_eq!(scheduler.check_schedule(at(12, 0, 0)).await.unwrap(), None);
        assert_eq!(scheduler.check_schedule(at(9, 0, 0)).await.unwrap(), Some(0));
        assert_eq!(scheduler.check_schedule(at(9, 0, 30)).await.unwrap(), None);
        assert_eq!(scheduler.last_run().await, Some(at(9, 0, 0)));
    }

    #[tokio::test]
    async fn test_trigger_now_ignores_schedule() {
        let scheduler = scheduler(&["09:00"]);
        assert_eq!(scheduler.trigger_now("ops").await.unwrap(), 0);
        assert!(scheduler.last_run().await.is_none());
        assert!(scheduler.next_run_time().unwrap() > Utc::now());
    }
}
