// src/services/crawler.rs

//! Incremental vacancy crawler.
//!
//! Walks the listing pages from the newest, keeps every relevant row that is
//! newer than the newest stored posting, and stops once `lookback`
//! consecutive rows in a row turned out to be already known. A single old
//! row is not enough to stop: edited topics jump to the top of the listing
//! out of chronological order.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::Result;
use crate::models::{Config, ListingRow, Posting};
use crate::services::{DateNormalizer, PageFetcher, RelevanceFilter};
use crate::storage::{InsertOutcome, PostingStore};

const LOG_DATE_FORMAT: &str = "%d.%m.%y %H:%M";

/// Immutable per-process crawl rules.
#[derive(Debug, Clone)]
pub struct CrawlRules {
    pub normalizer: DateNormalizer,
    pub filter: RelevanceFilter,
    /// Non-data rows at the top of every listing page
    pub header_rows: usize,
    /// Consecutive stale rows that end a run
    pub lookback: usize,
}

impl CrawlRules {
    /// Build the rules from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            normalizer: DateNormalizer::new(&config.locale),
            filter: RelevanceFilter::new(&config.filter)?,
            header_rows: config.crawler.header_rows,
            lookback: config.crawler.lookback,
        })
    }
}

/// Summary of a crawl run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Cutoff used for this run
    pub last_known: NaiveDateTime,
    /// Postings written to storage
    pub added: usize,
    /// Relevant rows the store already knew by name
    pub duplicates: usize,
    pub pages_scanned: usize,
    /// Data rows examined (header rows excluded)
    pub rows_seen: usize,
    /// Rows with an unreadable date
    pub skipped_rows: usize,
    /// Highest consecutive stale count reached
    pub peak_stale: usize,
    /// Whether the run ended on the lookback bound rather than the last page
    pub stopped_on_stale: bool,
}

impl CrawlSummary {
    fn new(last_known: NaiveDateTime) -> Self {
        Self {
            last_known,
            added: 0,
            duplicates: 0,
            pages_scanned: 0,
            rows_seen: 0,
            skipped_rows: 0,
            peak_stale: 0,
            stopped_on_stale: false,
        }
    }
}

/// Mutable state of one run.
struct CrawlState {
    stale: usize,
    summary: CrawlSummary,
}

impl CrawlState {
    fn last_known(&self) -> NaiveDateTime {
        self.summary.last_known
    }
}

/// Service running one incremental crawl over a [`PageFetcher`].
pub struct CrawlEngine<'a> {
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn PostingStore,
    rules: &'a CrawlRules,
}

impl<'a> CrawlEngine<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn PostingStore,
        rules: &'a CrawlRules,
    ) -> Self {
        Self {
            fetcher,
            store,
            rules,
        }
    }

    /// Crawl relative to the local current date.
    pub async fn run(&self) -> Result<CrawlSummary> {
        self.run_on(Local::now().date_naive()).await
    }

    /// Crawl with `today` as the reference for relative listing dates.
    ///
    /// A fetch or storage failure aborts the run; postings inserted before
    /// the failure stay stored.
    pub async fn run_on(&self, today: NaiveDate) -> Result<CrawlSummary> {
        let last_known = match self.store.latest_timestamp().await? {
            Some(timestamp) => timestamp,
            None => start_of_year(today),
        };
        log::info!(
            "Looking for vacancies newer than {}",
            last_known.format(LOG_DATE_FORMAT)
        );

        let mut state = CrawlState {
            stale: 0,
            summary: CrawlSummary::new(last_known),
        };

        if let Err(e) = self.walk(&mut state, today).await {
            log::error!(
                "Crawl aborted on page {} after {} new vacancies: {e}",
                state.summary.pages_scanned,
                state.summary.added
            );
            return Err(e);
        }

        Ok(state.summary)
    }

    async fn walk(&self, state: &mut CrawlState, today: NaiveDate) -> Result<()> {
        let lookback = self.rules.lookback;
        let total_pages = self.fetcher.total_pages().await?;
        log::debug!("Listing has {total_pages} pages");

        let mut page = 1;
        while page < total_pages && state.stale < lookback {
            let rows = self.fetcher.fetch_page(page).await?;
            state.summary.pages_scanned += 1;
            log::debug!("Page {page}/{total_pages}: {} rows", rows.len());

            for (index, row) in rows.iter().enumerate().skip(self.rules.header_rows) {
                if state.stale >= lookback {
                    break;
                }
                self.visit(state, row, page, index, today).await?;
            }
            page += 1;
        }

        if state.summary.stopped_on_stale {
            log::info!(
                "Stopped after {lookback} consecutive known vacancies on page {}",
                page - 1
            );
        }
        Ok(())
    }

    async fn visit(
        &self,
        state: &mut CrawlState,
        row: &ListingRow,
        page: usize,
        index: usize,
        today: NaiveDate,
    ) -> Result<()> {
        state.summary.rows_seen += 1;

        let published_at = match self.rules.normalizer.normalize(&row.raw_date, today) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                log::warn!("Skipping row {index} on page {page} ('{}'): {e}", row.title);
                state.summary.skipped_rows += 1;
                return Ok(());
            }
        };

        if published_at <= state.last_known() {
            state.stale += 1;
            state.summary.peak_stale = state.summary.peak_stale.max(state.stale);
            if state.stale >= self.rules.lookback {
                state.summary.stopped_on_stale = true;
            }
            return Ok(());
        }

        state.stale = 0;
        if !self.rules.filter.is_relevant(&row.title) {
            return Ok(());
        }

        let body = self.fetcher.fetch_detail(&row.link).await?;
        let posting = Posting {
            name: row.title.clone(),
            body,
            link: row.link.clone(),
            published_at,
        };

        match self.store.insert(&posting).await? {
            InsertOutcome::Inserted => {
                state.summary.added += 1;
                log::info!(
                    "Added vacancy [{}]: {}",
                    published_at.format(LOG_DATE_FORMAT),
                    posting.name
                );
            }
            InsertOutcome::Duplicate => {
                state.summary.duplicates += 1;
                log::debug!("Already stored: {}", posting.name);
            }
        }
        Ok(())
    }
}

/// Midnight of January 1st of `today`'s year.
fn start_of_year(today: NaiveDate) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(today.year(), 1, 1)
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
}
