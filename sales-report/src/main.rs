//! sales-report: scheduled sales report delivery
//!
//! Long-running service that:
//! - Sends daily, weekly and monthly combined reports to every subscriber
//! - Reads each tenant's sales through its own API credential
//! - Rotates and prunes its own log files

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sales_report::common::{init_logger_with_file, logger};
use sales_report::core::{BackgroundTasks, Config, TaskKind};
use sales_report::dispatcher::{
    BatchDispatcher, DeliveryPacer, MasterKey, ReportScheduler, SqliteRegistry, TelegramDelivery,
};
use sales_report::normalizer::QuantityMode;
use sales_report::source::UpstreamFactory;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;
    tracing::info!("Starting sales-report (env: {})", config.environment);
    if config.is_development() {
        tracing::warn!("Development mode: ENCRYPTION_KEY and BOT_TOKEN may be empty");
    }

    let vault = MasterKey::from_base64(&config.encryption_key)
        .map_err(|e| anyhow::anyhow!("ENCRYPTION_KEY: {e}"))?;
    let registry = SqliteRegistry::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to open registry at {}", config.database_url))?;
    let delivery = TelegramDelivery::new(
        config.bot_token.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let sources = UpstreamFactory::new(config.client_config());

    let dispatcher = BatchDispatcher::new(
        Arc::new(registry),
        Arc::new(vault),
        Arc::new(sources),
        Arc::new(delivery),
    )
    .with_pacer(DeliveryPacer::new(config.delivery_interval))
    .with_concurrency(config.fanout_concurrency)
    .with_quantity_mode(QuantityMode::Eager);

    let scheduler = ReportScheduler::from_config(Arc::new(dispatcher), &config)?;

    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();
    tasks.spawn("report_scheduler", TaskKind::Worker, scheduler.run(shutdown.clone()));
    if let Some(dir) = &config.log_dir {
        tasks.spawn(
            "log_cleanup",
            TaskKind::Periodic,
            logger::periodic_cleanup(PathBuf::from(dir), shutdown),
        );
    }
    tasks.log_summary();

    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    health.tick().await;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                tracing::info!("Shutdown signal received");
                break;
            }
            _ = health.tick() => {
                let exited = tasks.check_health();
                if exited > 0 {
                    tracing::warn!(exited, "Background tasks are no longer running");
                }
            }
        }
    }

    tasks.shutdown().await;
    Ok(())
}
