// Integration tests for Deal Watcher
// These tests drive whole cycles against a real SQLite cache

pub mod config_tests;
pub mod cycle_tests;
pub mod store_tests;

use async_trait::async_trait;
use deal_watcher::{
    cycle::CycleRunner,
    filter::NotabilityFilter,
    models::Catalog,
    plugins::{NotifierPlugin, PriceExtractor},
    render::{AlertRenderer, RenderOptions},
    scraper::ScrapeOrchestrator,
    store::{PriceStore, SqlitePriceStore},
    AppError, ExtractionError,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Extractor whose price per locator can be changed between cycles.
/// Unknown locators fail as if the price element were missing.
#[derive(Default)]
pub struct ScriptedExtractor {
    prices: Mutex<HashMap<String, Decimal>>,
}

impl ScriptedExtractor {
    pub fn set(&self, locator: &str, price: &str) {
        self.prices.lock().unwrap().insert(locator.to_string(), d(price));
    }

    pub fn remove(&self, locator: &str) {
        self.prices.lock().unwrap().remove(locator);
    }
}

#[async_trait]
impl PriceExtractor for ScriptedExtractor {
    async fn extract_price(&self, locator: &str) -> Result<Decimal, ExtractionError> {
        self.prices
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .ok_or_else(|| ExtractionError::NotFound {
                selector: "span.price".to_string(),
            })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    async fn send(&self, markdown: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(markdown.to_string());
        Ok(())
    }
}

/// A SQLite cache in a fresh temp directory. Keep the directory alive for as
/// long as the store is used.
pub async fn sqlite_store() -> anyhow::Result<(TempDir, Arc<SqlitePriceStore>)> {
    let dir = tempfile::tempdir()?;
    let url = database_url(&dir);
    let store = SqlitePriceStore::connect(&url).await?;
    Ok((dir, Arc::new(store)))
}

pub fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("prices.db").display())
}

/// Two retailers sharing one scripted extractor. "Sun Cream" (base 100) is
/// linked to both; "Serum" (base 40) only to Boots.
pub fn catalog(extractor: Arc<ScriptedExtractor>) -> anyhow::Result<Arc<Catalog>> {
    let mut builder = Catalog::builder();
    builder.add_retailer("boots", "Boots", extractor.clone())?;
    builder.add_retailer("amazon", "Amazon", extractor)?;
    builder.add_product(
        "Sun Cream",
        d("100"),
        Some("Skincare"),
        [
            ("boots", "https://boots.test/sun"),
            ("amazon", "https://amazon.test/sun"),
        ],
    )?;
    builder.add_product(
        "Serum",
        d("40"),
        None,
        [("boots", "https://boots.test/serum")],
    )?;
    Ok(Arc::new(builder.build()))
}

pub fn runner(
    catalog: Arc<Catalog>,
    store: Arc<dyn PriceStore>,
    notifier: Arc<RecordingNotifier>,
) -> anyhow::Result<CycleRunner> {
    Ok(CycleRunner::new(
        catalog,
        store,
        ScrapeOrchestrator::new(2, Duration::from_secs(5)),
        NotabilityFilter::new(d("0.1"))?,
        AlertRenderer::new(RenderOptions::default()),
        notifier,
    ))
}
