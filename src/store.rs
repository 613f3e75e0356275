//! Durable last-price cache keyed by (retailer, product).
//!
//! Prices cross this boundary as `Decimal` and are stored as integer minor
//! units (pence/cents), so repeated scrape/store cycles never accumulate
//! fractional drift. Rows are overwritten on every successful scrape and never
//! evicted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use tokio::sync::RwLock;

use crate::utils::error::AppError;
use crate::Result;

const MINOR_UNIT_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub retailer: String,
    pub product: String,
}

impl CacheKey {
    pub fn new(retailer: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            retailer: retailer.into(),
            product: product.into(),
        }
    }
}

/// Every cached price, read once at the start of a cycle.
pub type PriceSnapshot = HashMap<CacheKey, Decimal>;

/// A price to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub retailer: String,
    pub product: String,
    pub price: Decimal,
    pub scraped_at: DateTime<Utc>,
}

/// A persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub price_minor: i64,
    pub last_scrape: i64,
}

impl CacheEntry {
    pub fn price(&self) -> Decimal {
        from_minor_units(self.price_minor)
    }
}

pub fn to_minor_units(price: Decimal) -> Result<i64> {
    let rounded = price.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| AppError::Validation(format!("Price out of range: {}", price)))
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}

fn to_entries(records: &[PriceRecord]) -> Result<Vec<CacheEntry>> {
    records
        .iter()
        .map(|record| {
            Ok(CacheEntry {
                key: CacheKey::new(&record.retailer, &record.product),
                price_minor: to_minor_units(record.price)?,
                last_scrape: record.scraped_at.timestamp(),
            })
        })
        .collect()
}

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Every cached price.
    async fn get_all(&self) -> Result<PriceSnapshot>;

    /// Upsert one row per (retailer, product). All rows land or none do.
    async fn set_all(&self, records: &[PriceRecord]) -> Result<()>;

    /// Every cached row with its timestamp.
    async fn entries(&self) -> Result<Vec<CacheEntry>>;
}

/// SQLite-backed price cache.
pub struct SqlitePriceStore {
    pool: SqlitePool,
}

impl SqlitePriceStore {
    /// Open (creating if needed) the database at `url` and ensure the schema
    /// exists. In-memory databases get a single pinned connection so the data
    /// lives as long as the store.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scrape_cache (
                provider TEXT NOT NULL,
                product TEXT NOT NULL,
                price INTEGER NOT NULL,
                last_scrape INTEGER NOT NULL,
                PRIMARY KEY (provider, product)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn get_all(&self) -> Result<PriceSnapshot> {
        let rows: Vec<(String, String, i64)> =
            sqlx::query_as("SELECT provider, product, price FROM scrape_cache")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(provider, product, price)| (CacheKey::new(provider, product), from_minor_units(price)))
            .collect())
    }

    async fn set_all(&self, records: &[PriceRecord]) -> Result<()> {
        let entries = to_entries(records)?;
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(AppError::from_write)?;
        for entry in &entries {
            sqlx::query(
                "INSERT OR REPLACE INTO scrape_cache (provider, product, price, last_scrape) VALUES (?, ?, ?, ?)",
            )
            .bind(&entry.key.retailer)
            .bind(&entry.key.product)
            .bind(entry.price_minor)
            .bind(entry.last_scrape)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_write)?;
        }
        tx.commit().await.map_err(AppError::from_write)?;

        tracing::debug!(rows = entries.len(), "Persisted scraped prices");
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            "SELECT provider, product, price, last_scrape FROM scrape_cache ORDER BY provider, product",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(provider, product, price_minor, last_scrape)| CacheEntry {
                key: CacheKey::new(provider, product),
                price_minor,
                last_scrape,
            })
            .collect())
    }
}

/// Process-local price cache, used for dry runs and tests.
#[derive(Default)]
pub struct MemoryPriceStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn get_all(&self) -> Result<PriceSnapshot> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.price()))
            .collect())
    }

    async fn set_all(&self, records: &[PriceRecord]) -> Result<()> {
        let new_entries = to_entries(records)?;
        let mut entries = self.entries.write().await;
        for entry in new_entries {
            entries.insert(entry.key.clone(), entry);
        }
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let entries = self.entries.read().await;
        let mut rows: Vec<CacheEntry> = entries.values().cloned().collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }
}
