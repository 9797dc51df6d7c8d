//! Splitly service binary

use anyhow::Context;
use splitly::{Config, InMemoryStore, LogMailer, Splitly};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("SPLITLY_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("loading config from environment")?,
    };

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(service = %config.service_name, "Starting Splitly");

    let app = Splitly::new(config, Arc::new(InMemoryStore::new()), Arc::new(LogMailer))?;

    if app.config().reminder.enabled {
        let scheduler = Arc::new(app.scheduler()?);
        tracing::info!(next_run = %scheduler.next_run_time()?, "Reminder scheduler enabled");
        tokio::spawn(scheduler.start());
    }

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down Splitly");
    Ok(())
}
