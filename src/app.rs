use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::cycle::CycleRunner;
use crate::filter::NotabilityFilter;
use crate::models::Catalog;
use crate::plugins::extractors::ExtractorFactory;
use crate::plugins::PluginManager;
use crate::render::{AlertRenderer, RenderOptions};
use crate::scheduler::CycleScheduler;
use crate::scraper::ScrapeOrchestrator;
use crate::store::{MemoryPriceStore, PriceStore, SqlitePriceStore};
use crate::Result;

/// Everything built from configuration at startup.
pub struct App {
    config: AppConfig,
    runner: Arc<CycleRunner>,
    notifiers: PluginManager,
}

impl App {
    /// A dry run keeps the price cache in memory and prints alerts instead of
    /// sending them.
    pub async fn build(config: AppConfig, dry_run: bool) -> Result<Self> {
        let catalog = Arc::new(build_catalog(&config)?);
        tracing::info!(
            retailers = catalog.retailers().count(),
            products = catalog.products().count(),
            links = catalog.link_count(),
            "Catalog loaded"
        );

        let store: Arc<dyn PriceStore> = if dry_run {
            Arc::new(MemoryPriceStore::new())
        } else {
            Arc::new(SqlitePriceStore::connect(&config.general.database).await?)
        };

        let notifiers = PluginManager::from_config(&config.notifications, dry_run).await?;

        let runner = CycleRunner::new(
            catalog,
            store,
            ScrapeOrchestrator::new(
                config.scraper.max_concurrent_checks,
                Duration::from_secs(config.scraper.request_timeout),
            ),
            NotabilityFilter::new(config.general.min_discount)?,
            AlertRenderer::new(RenderOptions {
                currency_symbol: config.general.currency_symbol.clone(),
            }),
            Arc::new(notifiers.clone()),
        );

        Ok(Self {
            config,
            runner: Arc::new(runner),
            notifiers,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn runner(&self) -> Arc<CycleRunner> {
        self.runner.clone()
    }

    pub fn notifiers(&self) -> &PluginManager {
        &self.notifiers
    }

    pub fn scheduler(&self) -> CycleScheduler {
        CycleScheduler::new(
            self.runner.clone(),
            Duration::from_secs(self.config.general.interval_secs),
        )
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.notifiers.shutdown().await
    }
}

/// Retailers first, so product links can resolve against them.
pub fn build_catalog(config: &AppConfig) -> Result<Catalog> {
    let mut factory = ExtractorFactory::new(&config.scraper);
    let mut builder = Catalog::builder();

    for retailer in &config.retailers {
        let extractor = factory.build(retailer)?;
        builder.add_retailer(&retailer.key, &retailer.name, extractor)?;
    }

    for product in &config.products {
        builder.add_product(
            &product.name,
            product.base_price,
            product.category.as_deref(),
            product.links.iter().map(|(key, url)| (key.as_str(), url.as_str())),
        )?;
    }

    Ok(builder.build())
}
