//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Date normalization (`DateNormalizer`)
//! - Topic filtering (`RelevanceFilter`)
//! - Listing fetching (`PageFetcher`, `HtmlPageFetcher`)
//! - Incremental crawling (`CrawlEngine`)

mod crawler;
mod filter;
mod listing;
mod normalize;

pub use crawler::{CrawlEngine, CrawlRules, CrawlSummary};
pub use filter::RelevanceFilter;
pub use listing::{HtmlPageFetcher, PageFetcher};
pub use normalize::{DateFormatError, DateNormalizer};
