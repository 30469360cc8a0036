// src/pipeline/crawl.rs

//! Vacancy crawling pipeline.

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::models::{Config, DatabaseConfig};
use crate::services::{CrawlEngine, CrawlRules, CrawlSummary, HtmlPageFetcher};
use crate::storage::SqlPostingStore;

/// Everything one crawl cycle needs, built once at startup.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub database: DatabaseConfig,
    pub fetcher: Arc<HtmlPageFetcher>,
    pub rules: Arc<CrawlRules>,
}

impl CrawlJob {
    /// Build the job, compiling selectors and rules so that bad
    /// configuration fails here rather than on every run.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            database: config.database.clone(),
            fetcher: Arc::new(HtmlPageFetcher::new(&config.crawler, &config.selectors)?),
            rules: Arc::new(CrawlRules::from_config(config)?),
        })
    }
}

/// Run one crawl cycle against the configured forum and database.
pub async fn run_crawler(job: &CrawlJob) -> Result<CrawlSummary> {
    let started = Instant::now();
    log::info!("Vacancy crawl starting");

    let store = SqlPostingStore::connect(&job.database).await?;

    let result = CrawlEngine::new(job.fetcher.as_ref(), &store, &job.rules)
        .run()
        .await;
    store.close().await;
    let summary = result?;

    log::info!(
        "Crawl complete in {:.1}s: {} new vacancies, {} duplicates, {} pages, {} rows ({} skipped)",
        started.elapsed().as_secs_f64(),
        summary.added,
        summary.duplicates,
        summary.pages_scanned,
        summary.rows_seen,
        summary.skipped_rows
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [database]
        driver = "sqlite"
        url = "sqlite::memory:"
        username = ""
        password = ""

        [schedule]
        cron = "0 0 * * * ?"

        [crawler]
        lookback = 7
        header_rows = 2
    "#;

    #[test]
    fn test_job_from_config() {
        let config = Config::parse(CONFIG).unwrap();
        let job = CrawlJob::from_config(&config).unwrap();

        assert_eq!(job.rules.lookback, 7);
        assert_eq!(job.rules.header_rows, 2);
        assert!(job.rules.filter.is_relevant("Java Developer"));
    }

    #[test]
    fn test_job_rejects_bad_selectors() {
        let content = format!("{CONFIG}\n[selectors]\ntable = \"[[broken\"\n");
        let config = Config::parse(&content).unwrap();

        let err = CrawlJob::from_config(&config).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("[[broken"));
    }
}
