// src/models/mod.rs

//! Domain models for the crawler application.

mod config;
mod posting;

pub use config::{
    Config, CrawlerConfig, DatabaseConfig, Driver, FilterConfig, LocaleConfig, ScheduleConfig,
    SelectorConfig,
};
pub use posting::{ListingRow, Posting, from_millis, to_millis};
