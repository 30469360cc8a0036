//! Application configuration structures.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection settings
    pub database: DatabaseConfig,

    /// Crawl cadence
    pub schedule: ScheduleConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// CSS selectors for the forum markup
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Localized date words
    #[serde(default)]
    pub locale: LocaleConfig,

    /// Topic filter
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| AppError::config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| AppError::config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let driver = self.database.driver()?;
        if self.database.url.trim().is_empty() {
            return Err(AppError::config("database.url is empty"));
        }
        let scheme = self.database.url_scheme();
        if !driver.accepts_scheme(&scheme) {
            return Err(AppError::config(format!(
                "database.url scheme '{scheme}' does not match driver '{}'",
                self.database.driver
            )));
        }
        self.schedule.expression()?;
        if Url::parse(&self.crawler.base_url).is_err() {
            return Err(AppError::config(format!(
                "crawler.base_url '{}' is not a valid URL",
                self.crawler.base_url
            )));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.lookback == 0 {
            return Err(AppError::config("crawler.lookback must be > 0"));
        }
        self.locale.validate()?;
        if self.filter.keyword.trim().is_empty() {
            return Err(AppError::config("filter.keyword is empty"));
        }
        Ok(())
    }
}

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    Sqlite,
}

impl Driver {
    /// Resolve a driver identifier, accepting the JDBC class names used by
    /// older deployments.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "org.postgresql.driver" => Some(Self::Postgres),
            "sqlite" | "sqlite3" | "org.sqlite.jdbc" => Some(Self::Sqlite),
            _ => None,
        }
    }

    fn accepts_scheme(self, scheme: &str) -> bool {
        match self {
            Self::Postgres => matches!(scheme, "postgres" | "postgresql"),
            Self::Sqlite => scheme == "sqlite",
        }
    }
}

/// Database connection settings. This is the payload handed to every
/// scheduled crawl.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub driver: String,
    pub url: String,
    pub username: String,
    pub password: String,
}

impl DatabaseConfig {
    /// Parsed driver identifier.
    pub fn driver(&self) -> Result<Driver> {
        Driver::from_id(&self.driver).ok_or_else(|| {
            AppError::config(format!("unsupported database driver '{}'", self.driver))
        })
    }

    /// URL without a leading `jdbc:` prefix.
    fn bare_url(&self) -> &str {
        let url = self.url.trim();
        url.strip_prefix("jdbc:").unwrap_or(url)
    }

    fn url_scheme(&self) -> String {
        self.bare_url()
            .split_once(':')
            .map(|(scheme, _)| scheme.to_lowercase())
            .unwrap_or_default()
    }

    /// Connection URL with the configured credentials applied.
    ///
    /// Credentials already present in the URL take precedence. SQLite files
    /// are opened read-write-create unless the URL picks a `mode` itself.
    pub fn connection_url(&self) -> Result<String> {
        let bare = self.bare_url();
        if self.driver()? == Driver::Sqlite {
            return Ok(sqlite_url(bare));
        }

        let mut url = Url::parse(bare)?;
        if url.username().is_empty() && !self.username.is_empty() {
            url.set_username(&self.username)
                .map_err(|_| AppError::config("database.url cannot carry a username"))?;
            if !self.password.is_empty() {
                url.set_password(Some(&self.password))
                    .map_err(|_| AppError::config("database.url cannot carry a password"))?;
            }
        }
        Ok(url.to_string())
    }
}

fn sqlite_url(bare: &str) -> String {
    let query = bare.split_once('?').map(|(_, query)| query).unwrap_or_default();
    let picks_mode = query.split('&').any(|pair| pair.starts_with("mode="));
    if bare.contains(":memory:") || picks_mode {
        return bare.to_string();
    }
    let separator = if bare.contains('?') { '&' } else { '?' };
    format!("{bare}{separator}mode=rwc")
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Crawl cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Six or seven field cron expression (seconds first)
    pub cron: String,
}

impl ScheduleConfig {
    /// Cron expression for the scheduler. A Quartz-style `?` ("no specific
    /// value") becomes `*`.
    pub fn expression(&self) -> Result<String> {
        let fields: Vec<&str> = self
            .cron
            .split_whitespace()
            .map(|field| if field == "?" { "*" } else { field })
            .collect();
        if !(6..=7).contains(&fields.len()) {
            return Err(AppError::config(format!(
                "schedule.cron '{}' must have 6 or 7 fields (seconds first)",
                self.cron
            )));
        }
        Ok(fields.join(" "))
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Listing root; page `n` lives at `{base_url}{n}`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay before each request in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,

    /// Table header and pinned info rows at the top of every page
    #[serde(default = "defaults::header_rows")]
    pub header_rows: usize,

    /// Consecutive stale rows tolerated before the crawl stops
    #[serde(default = "defaults::lookback")]
    pub lookback: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: 0,
            header_rows: defaults::header_rows(),
            lookback: defaults::lookback(),
        }
    }
}

/// CSS selectors for scraping the forum.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Pagination blocks; the last link of the chosen block holds the page count
    #[serde(default = "defaults::pager")]
    pub pager: String,

    /// Which pagination block to read (zero-based)
    #[serde(default = "defaults::pager_index")]
    pub pager_index: usize,

    /// The topic table
    #[serde(default = "defaults::table")]
    pub table: String,

    /// Rows of the topic table
    #[serde(default = "defaults::row")]
    pub row: String,

    /// Title anchor within a row
    #[serde(default = "defaults::title")]
    pub title: String,

    /// Date cell within a row
    #[serde(default = "defaults::date")]
    pub date: String,

    /// Message bodies on the detail page
    #[serde(default = "defaults::body")]
    pub body: String,

    /// Which message body holds the vacancy text (zero-based)
    #[serde(default = "defaults::body_index")]
    pub body_index: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            pager: defaults::pager(),
            pager_index: defaults::pager_index(),
            table: defaults::table(),
            row: defaults::row(),
            title: defaults::title(),
            date: defaults::date(),
            body: defaults::body(),
            body_index: defaults::body_index(),
        }
    }
}

/// Words the forum uses when rendering dates.
#[derive(Debug, Clone, Deserialize)]
pub struct LocaleConfig {
    /// Word shown instead of the current date
    #[serde(default = "defaults::today")]
    pub today: String,

    /// Word shown instead of the previous date
    #[serde(default = "defaults::yesterday")]
    pub yesterday: String,

    /// Month abbreviation to month number
    #[serde(default = "defaults::months")]
    pub months: BTreeMap<String, u32>,
}

impl LocaleConfig {
    fn validate(&self) -> Result<()> {
        if self.today.trim().is_empty() || self.yesterday.trim().is_empty() {
            return Err(AppError::config("locale.today and locale.yesterday must be set"));
        }
        if self.months.len() != 12 {
            return Err(AppError::config(format!(
                "locale.months must have 12 entries, found {}",
                self.months.len()
            )));
        }
        let mut seen = [false; 12];
        for (token, &month) in &self.months {
            if !(1..=12).contains(&month) {
                return Err(AppError::config(format!(
                    "locale.months.{token} = {month} is not a month"
                )));
            }
            seen[month as usize - 1] = true;
        }
        if seen.contains(&false) {
            return Err(AppError::config("locale.months must cover every month"));
        }
        Ok(())
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            today: defaults::today(),
            yesterday: defaults::yesterday(),
            months: defaults::months(),
        }
    }
}

/// Topic filter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Substring a relevant title must contain
    #[serde(default = "defaults::keyword")]
    pub keyword: String,

    /// Near-miss phrases removed before the keyword test
    #[serde(default = "defaults::exclusions")]
    pub exclusions: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keyword: defaults::keyword(),
            exclusions: defaults::exclusions(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    pub fn base_url() -> String {
        "https://www.sql.ru/forum/job-offers/".into()
    }
    pub fn user_agent() -> String {
        concat!("vacancy-crawler/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn header_rows() -> usize {
        // table header + three pinned forum notices
        4
    }
    pub fn lookback() -> usize {
        5
    }

    pub fn pager() -> String {
        ".sort_options".into()
    }
    pub fn pager_index() -> usize {
        1
    }
    pub fn table() -> String {
        ".forumTable".into()
    }
    pub fn row() -> String {
        "tr".into()
    }
    pub fn title() -> String {
        "td:nth-child(2) a".into()
    }
    pub fn date() -> String {
        "td:last-child".into()
    }
    pub fn body() -> String {
        ".msgBody".into()
    }
    pub fn body_index() -> usize {
        1
    }

    pub fn today() -> String {
        "сегодня".into()
    }
    pub fn yesterday() -> String {
        "вчера".into()
    }
    pub fn months() -> BTreeMap<String, u32> {
        [
            "янв", "фев", "мар", "апр", "май", "июн", "июл", "авг", "сен", "окт", "ноя", "дек",
        ]
        .into_iter()
        .zip(1..)
        .map(|(token, month)| (token.to_string(), month))
        .collect()
    }

    pub fn keyword() -> String {
        "java".into()
    }
    pub fn exclusions() -> Vec<String> {
        vec!["javascript".into(), "java script".into(), "java-script".into()]
    }
}
