//! Pipeline entry points.
//!
//! - `run_crawler`: one crawl cycle against the configured forum and database
//! - `CrawlScheduler`: runs `run_crawler` on a cron cadence

pub mod crawl;
pub mod schedule;

pub use crawl::{CrawlJob, run_crawler};
pub use schedule::CrawlScheduler;
