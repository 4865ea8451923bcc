//! Cron scheduler for the batch dispatcher
//!
//! Each job carries a six-field cron expression evaluated in the
//! configured timezone. The loop wakes every tick, starts due jobs as
//! separate tasks and skips a firing when the previous run of the same job
//! is still in flight.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio_util::sync::CancellationToken;

use super::{BatchDispatcher, JobKind};
use crate::core::{Config, ConfigError};

/// Clears a job's running flag when the firing ends, panics included
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// One cron-driven job
pub struct JobSchedule {
    job: JobKind,
    schedule: Schedule,
    timezone: Tz,
    next_run: Option<DateTime<Tz>>,
    running: Arc<AtomicBool>,
}

impl JobSchedule {
    pub fn new(job: JobKind, expr: &str, timezone: Tz) -> Result<Self, ConfigError> {
        let schedule = Schedule::from_str(expr).map_err(|e| ConfigError::Invalid {
            name: format!("{}_cron", job.id()),
            reason: format!("{expr}: {e}"),
        })?;
        let next_run = schedule.upcoming(timezone).next();
        Ok(Self {
            job,
            schedule,
            timezone,
            next_run,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn job(&self) -> JobKind {
        self.job
    }

    pub fn next_run(&self) -> Option<DateTime<Tz>> {
        self.next_run
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn should_run(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|next| now >= next)
    }

    fn try_start(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .ok()
            .map(|_| RunGuard {
                running: self.running.clone(),
            })
    }

    /// Claim a due firing
    ///
    /// The schedule advances whether or not the firing starts, so a skipped
    /// overlap is dropped rather than queued.
    pub fn claim(&mut self, now: DateTime<Utc>) -> Option<RunGuard> {
        if !self.should_run(now) {
            return None;
        }
        self.next_run = self
            .schedule
            .after(&now.with_timezone(&self.timezone))
            .next();

        let guard = self.try_start();
        if guard.is_none() {
            tracing::warn!(job = %self.job, "Previous run still in progress, skipping firing");
        }
        guard
    }
}

/// Drives a [`BatchDispatcher`] from cron schedules
pub struct ReportScheduler {
    dispatcher: Arc<BatchDispatcher>,
    jobs: Vec<JobSchedule>,
    timezone: Tz,
    check_interval: Duration,
}

impl ReportScheduler {
    pub fn new(dispatcher: Arc<BatchDispatcher>, timezone: Tz) -> Self {
        Self {
            dispatcher,
            jobs: Vec::new(),
            timezone,
            check_interval: Duration::from_secs(30),
        }
    }

    /// Daily, weekly and monthly jobs from configuration
    pub fn from_config(dispatcher: Arc<BatchDispatcher>, config: &Config) -> Result<Self, ConfigError> {
        let mut scheduler =
            Self::new(dispatcher, config.timezone).with_check_interval(config.scheduler_tick);
        scheduler.add(JobKind::Daily, &config.daily_cron)?;
        scheduler.add(JobKind::Weekly, &config.weekly_cron)?;
        scheduler.add(JobKind::Monthly, &config.monthly_cron)?;
        Ok(scheduler)
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn add(&mut self, job: JobKind, expr: &str) -> Result<(), ConfigError> {
        let schedule = JobSchedule::new(job, expr, self.timezone)?;
        tracing::info!(job = %job, cron = %expr, next_run = ?schedule.next_run(), "Scheduled report job");
        self.jobs.push(schedule);
        Ok(())
    }

    pub fn jobs(&self) -> &[JobSchedule] {
        &self.jobs
    }

    /// Start every job due at `now`
    fn tick(&mut self, now: DateTime<Utc>) {
        for schedule in &mut self.jobs {
            let Some(guard) = schedule.claim(now) else {
                continue;
            };
            let job = schedule.job();
            let today = now.with_timezone(&self.timezone).date_naive();
            let dispatcher = self.dispatcher.clone();

            tokio::spawn(async move {
                let _guard = guard;
                tracing::info!(job = %job, "Scheduled job started");
                match dispatcher.run(job, today).await {
                    Ok(summary) => tracing::info!(
                        job = %job,
                        attempted = summary.attempted(),
                        successes = summary.successes,
                        failures = summary.failures,
                        "Scheduled job finished"
                    ),
                    Err(e) => tracing::error!(job = %job, error = %e, "Scheduled job aborted"),
                }
            });
        }
    }

    /// Run until `shutdown` is cancelled
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            jobs = self.jobs.len(),
            timezone = %self.timezone,
            "Report scheduler started"
        );

        loop {
            self.tick(Utc::now());

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Report scheduler stopping");
                    break;
                }
                _ = tokio::time::sleep(self.check_interval) => {}
            }
        }
    }
}
