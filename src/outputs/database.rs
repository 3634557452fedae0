//! MySQL output: insert new items into the `news` table.
//!
//! Items are deduplicated by the pair (`link`, `entity`): an item whose pair
//! is already present is skipped, never updated. The whole batch of a run is
//! written in one transaction, so a database error part-way through rolls
//! back every insert of that run.
//!
//! # Table
//!
//! | Column | Source |
//! |--------|--------|
//! | `category`, `entity`, `title`, `description`, `link` | [`NewsItem`] fields |
//! | `sourceUrl` | [`NewsItem::source_url`] |
//! | `publishedAt` | extraction time |
//! | `scrapedAt` | server default (`CURRENT_TIMESTAMP`) |
//!
//! The pool is opened through `sqlx::Any` so the same statements run against
//! MySQL in production and SQLite in tests.

use crate::models::NewsItem;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{Any, AnyPool, Transaction};
use std::fmt;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

const SELECT_EXISTING: &str = "SELECT 1 FROM news WHERE link = ? AND entity = ? LIMIT 1";
const INSERT_NEWS: &str = "INSERT INTO news (category, entity, title, description, link, sourceUrl, publishedAt) \
     VALUES (?, ?, ?, ?, ?, ?, ?)";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the news database.
///
/// Built from the `DB_HOST`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` and
/// `DB_PORT` settings (see [`crate::cli::DbArgs`]).
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub port: u16,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: String::new(),
            name: "mannarella".to_string(),
            port: 3306,
        }
    }
}

impl DbConfig {
    /// MySQL connection URL with user, password and database percent-encoded.
    pub fn url(&self) -> String {
        let credentials = if self.password.is_empty() {
            urlencoding::encode(&self.user).into_owned()
        } else {
            format!(
                "{}:{}",
                urlencoding::encode(&self.user),
                urlencoding::encode(&self.password)
            )
        };
        format!(
            "mysql://{}@{}:{}/{}",
            credentials,
            self.host,
            self.port,
            urlencoding::encode(&self.name)
        )
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("name", &self.name)
            .field("port", &self.port)
            .finish()
    }
}

/// Counts produced by one [`DbSink::save`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    /// Rows committed.
    pub inserted: usize,
    /// Items whose (`link`, `entity`) pair was already stored.
    pub skipped: usize,
}

/// Handle on the news database for the duration of one run.
#[derive(Debug)]
pub struct DbSink {
    pool: AnyPool,
}

impl DbSink {
    /// Connect to the MySQL database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be established; the caller
    /// treats this as fatal before any scraping happens.
    #[instrument(level = "info", skip_all, fields(host = %config.host, port = config.port, db = %config.name))]
    pub async fn connect(config: &DbConfig) -> Result<Self, sqlx::Error> {
        Self::connect_url(&config.url()).await
    }

    /// Connect to any database URL supported by the installed drivers.
    pub async fn connect_url(url: &str) -> Result<Self, sqlx::Error> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(url)
            .await?;
        info!("Connected to news database");
        Ok(Self { pool })
    }

    /// Insert every item not yet stored, in one transaction.
    ///
    /// # Returns
    ///
    /// The insert/skip counts of the committed batch. If any statement or the
    /// commit fails, the batch is rolled back, the error logged, and an
    /// all-zero report returned.
    #[instrument(level = "info", skip_all, fields(count = items.len()))]
    pub async fn save(&self, items: &[NewsItem]) -> SaveReport {
        match self.save_batch(items).await {
            Ok(report) => {
                info!(inserted = report.inserted, skipped = report.skipped, "Saved news batch");
                report
            }
            Err(e) => {
                error!(error = %e, "Error saving news to database; batch rolled back");
                SaveReport::default()
            }
        }
    }

    async fn save_batch(&self, items: &[NewsItem]) -> Result<SaveReport, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        match insert_new(&mut tx, items).await {
            Ok(report) => {
                tx.commit().await?;
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Release the connection pool.
    pub async fn close(self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

async fn insert_new(tx: &mut Transaction<'_, Any>, items: &[NewsItem]) -> Result<SaveReport, sqlx::Error> {
    let mut report = SaveReport::default();

    for item in items {
        let existing = sqlx::query(SELECT_EXISTING)
            .bind(item.link.as_str())
            .bind(item.entity.as_str())
            .fetch_optional(&mut **tx)
            .await?;
        if existing.is_some() {
            report.skipped += 1;
            continue;
        }

        let published_at = item.published_at.format("%Y-%m-%d %H:%M:%S").to_string();
        sqlx::query(INSERT_NEWS)
            .bind(item.category.as_str())
            .bind(item.entity.as_str())
            .bind(item.title.as_str())
            .bind(item.description.as_deref())
            .bind(item.link.as_str())
            .bind(item.source_url.as_str())
            .bind(published_at)
            .execute(&mut **tx)
            .await?;
        report.inserted += 1;
    }

    Ok(report)
}
