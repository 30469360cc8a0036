// src/pipeline/schedule.rs

//! Recurring crawl trigger.

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::{AppError, Result};
use crate::models::ScheduleConfig;
use crate::pipeline::crawl::{CrawlJob, run_crawler};

/// Cron-driven crawl runner. Overlapping ticks are skipped.
pub struct CrawlScheduler {
    scheduler: JobScheduler,
}

impl CrawlScheduler {
    /// Register the crawl job and start ticking. Ticks follow local time.
    pub async fn start(schedule: &ScheduleConfig, job: CrawlJob) -> Result<Self> {
        let expression = schedule.expression()?;
        let scheduler = JobScheduler::new().await?;

        let running = Arc::new(Mutex::new(()));
        let crawl_job = Job::new_async_tz(expression.as_str(), Local, move |_uuid, _lock| {
            let job = job.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                let crawl = async {
                    if let Err(e) = run_crawler(&job).await {
                        log::error!("Scheduled crawl failed: {e}");
                    }
                };
                if !run_exclusive(&running, crawl).await {
                    log::warn!("Previous crawl still running, skipping this tick");
                }
            })
        })
        .map_err(|e| AppError::config(format!("schedule.cron '{expression}': {e}")))?;

        scheduler.add(crawl_job).await?;
        scheduler.start().await?;
        log::info!("Crawl scheduled with cron '{expression}'");

        Ok(Self { scheduler })
    }

    /// Stop ticking. A crawl in progress is not interrupted.
    pub async fn shutdown(mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        log::info!("Scheduler stopped");
        Ok(())
    }
}

/// Run `task` unless another task holds `running`. Returns whether it ran.
async fn run_exclusive<F>(running: &Mutex<()>, task: F) -> bool
where
    F: Future<Output = ()>,
{
    let Ok(_guard) = running.try_lock() else {
        return false;
    };
    task.await;
    true
}
