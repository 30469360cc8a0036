//! SQL storage implementation.
//!
//! Postings live in a single `vacancy` table:
//!
//! ```text
//! vacancy
//! ├── id        auto-increment primary key
//! ├── name      unique, at most 512 characters
//! ├── text      description
//! ├── link      at most 512 characters
//! └── date_add  publication time, milliseconds
//! ```
//!
//! The table is created on connect when missing. Postgres and SQLite are
//! supported through the sqlx `Any` driver.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::error::{AppError, Result};
use crate::models::{DatabaseConfig, Driver, Posting, from_millis, to_millis};
use crate::storage::{InsertOutcome, PostingStore};
use crate::utils::truncate_graphemes;

const TABLE: &str = "vacancy";

/// Width of the `name` and `link` columns.
pub const MAX_TEXT_CHARS: usize = 512;

const CREATE_TABLE_POSTGRES: &str = "CREATE TABLE IF NOT EXISTS vacancy (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(512) NOT NULL UNIQUE,
    text TEXT,
    link VARCHAR(512),
    date_add BIGINT NOT NULL
)";

const CREATE_TABLE_SQLITE: &str = "CREATE TABLE IF NOT EXISTS vacancy (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    text TEXT,
    link TEXT,
    date_add INTEGER NOT NULL
)";

const CREATE_DATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS vacancy_date_add_idx ON vacancy (date_add)";

const TABLE_EXISTS_POSTGRES: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = current_schema() AND table_name::text = $1";

const TABLE_EXISTS_SQLITE: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1";

const INSERT_POSTING: &str = "INSERT INTO vacancy (name, text, link, date_add) \
     VALUES ($1, $2, $3, $4) ON CONFLICT (name) DO NOTHING";

const LATEST_TIMESTAMP: &str = "SELECT MAX(date_add) FROM vacancy";

const COUNT_POSTINGS: &str = "SELECT COUNT(*) FROM vacancy";

/// Posting storage backed by a SQL database.
#[derive(Clone)]
pub struct SqlPostingStore {
    pool: AnyPool,
    driver: Driver,
}

impl SqlPostingStore {
    /// Connect to the configured database and make sure the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let driver = config.driver()?;
        let url = config.connection_url()?;
        let pool = AnyPoolOptions::new()
            .max_connections(match driver {
                // one connection keeps in-memory databases alive and shared
                Driver::Sqlite => 1,
                Driver::Postgres => 4,
            })
            .connect(&url)
            .await?;

        let store = Self { pool, driver };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        if self.table_exists().await? {
            return Ok(());
        }

        log::info!("Creating table {TABLE}");
        let create = match self.driver {
            Driver::Postgres => CREATE_TABLE_POSTGRES,
            Driver::Sqlite => CREATE_TABLE_SQLITE,
        };
        sqlx::query(create).execute(&self.pool).await?;
        sqlx::query(CREATE_DATE_INDEX).execute(&self.pool).await?;
        log::info!("Table {TABLE} created");
        Ok(())
    }

    async fn table_exists(&self) -> Result<bool> {
        let sql = match self.driver {
            Driver::Postgres => TABLE_EXISTS_POSTGRES,
            Driver::Sqlite => TABLE_EXISTS_SQLITE,
        };
        let count: i64 = sqlx::query_scalar(sql)
            .bind(TABLE)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Number of stored postings.
    pub async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar(COUNT_POSTINGS)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl PostingStore for SqlPostingStore {
    async fn latest_timestamp(&self) -> Result<Option<NaiveDateTime>> {
        let millis: Option<i64> = sqlx::query_scalar(LATEST_TIMESTAMP)
            .fetch_one(&self.pool)
            .await?;

        match millis {
            None => Ok(None),
            Some(ms) => from_millis(ms)
                .map(Some)
                .ok_or_else(|| AppError::storage(format!("invalid timestamp {ms} in {TABLE}"))),
        }
    }

    async fn insert(&self, posting: &Posting) -> Result<InsertOutcome> {
        let result = sqlx::query(INSERT_POSTING)
            .bind(truncate_graphemes(&posting.name, MAX_TEXT_CHARS))
            .bind(posting.body.as_str())
            .bind(truncate_graphemes(&posting.link, MAX_TEXT_CHARS))
            .bind(to_millis(posting.published_at))
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn memory_store() -> SqlPostingStore {
        let config = DatabaseConfig {
            driver: "sqlite".to_string(),
            url: "sqlite::memory:".to_string(),
            username: String::new(),
            password: String::new(),
        };
        SqlPostingStore::connect(&config).await.unwrap()
    }

    fn posting(name: &str, day: u32, hour: u32) -> Posting {
        Posting {
            name: name.to_string(),
            body: format!("{name} body"),
            link: format!("https://www.sql.ru/forum/{day}{hour}/topic"),
            published_at: NaiveDate::from_ymd_opt(2024, 10, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn test_creates_schema() {
        let store = memory_store().await;
        assert!(store.table_exists().await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_creates_missing_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vacancies.db");
        let config = DatabaseConfig {
            driver: "sqlite".to_string(),
            url: format!("sqlite:{}", path.display()),
            username: String::new(),
            password: String::new(),
        };

        let store = SqlPostingStore::connect(&config).await.unwrap();
        store.insert(&posting("Java Developer", 10, 9)).await.unwrap();
        store.close().await;

        assert!(path.exists());
        let reopened = SqlPostingStore::connect(&config).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_schema_bootstrap_is_repeatable() {
        let store = memory_store().await;
        store.ensure_schema().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_latest_timestamp_empty() {
        let store = memory_store().await;
        assert_eq!(store.latest_timestamp().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_and_latest_timestamp() {
        let store = memory_store().await;
        let older = posting("Java Developer", 10, 9);
        let newer = posting("Senior Java Developer", 12, 18);

        assert_eq!(store.insert(&newer).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert(&older).await.unwrap(), InsertOutcome::Inserted);

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.latest_timestamp().await.unwrap(),
            Some(newer.published_at)
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_is_ignored() {
        let store = memory_store().await;
        let first = posting("Java Developer", 10, 9);
        let mut bumped = posting("Java Developer", 11, 9);
        bumped.body = "edited".to_string();

        assert_eq!(store.insert(&first).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert(&bumped).await.unwrap(), InsertOutcome::Duplicate);

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(
            store.latest_timestamp().await.unwrap(),
            Some(first.published_at)
        );
    }

    #[tokio::test]
    async fn test_long_names_are_truncated() {
        let store = memory_store().await;
        let long = posting(&"Java ".repeat(200), 10, 9);
        let same_prefix = posting(&format!("{}tail", "Java ".repeat(200)), 10, 10);

        assert_eq!(store.insert(&long).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(&same_prefix).await.unwrap(),
            InsertOutcome::Duplicate
        );
    }
}
