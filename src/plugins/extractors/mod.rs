// Price extractor implementations
pub mod browser;
pub mod http;
pub mod price_text;

pub use browser::{BrowserPool, BrowserPriceExtractor};
pub use http::HttpPriceExtractor;
pub use price_text::{parse_price, PriceSelector};

use std::sync::Arc;

use crate::config::{RenderMode, RetailerConfig, ScraperConfig};
use crate::plugins::traits::PriceExtractor;
use crate::Result;

/// Builds one extractor per configured retailer. The browser pool is only
/// started if some retailer actually needs it, and is then shared.
pub struct ExtractorFactory<'a> {
    scraper: &'a ScraperConfig,
    browser_pool: Option<Arc<BrowserPool>>,
}

impl<'a> ExtractorFactory<'a> {
    pub fn new(scraper: &'a ScraperConfig) -> Self {
        Self {
            scraper,
            browser_pool: None,
        }
    }

    pub fn build(&mut self, retailer: &RetailerConfig) -> Result<Arc<dyn PriceExtractor>> {
        let selector = PriceSelector::new(&retailer.selector, retailer.child_selector.as_deref())?;

        let extractor: Arc<dyn PriceExtractor> = match retailer.render {
            RenderMode::Http => Arc::new(HttpPriceExtractor::new(
                selector,
                &self.scraper.user_agent,
                self.scraper.request_timeout,
            )?),
            RenderMode::Browser => {
                let pool = match &self.browser_pool {
                    Some(pool) => pool.clone(),
                    None => {
                        let pool = Arc::new(BrowserPool::new(self.scraper)?);
                        self.browser_pool = Some(pool.clone());
                        pool
                    }
                };
                Arc::new(BrowserPriceExtractor::new(pool, selector, self.scraper.request_timeout))
            }
        };

        tracing::debug!(retailer = %retailer.name, render = ?retailer.render, "Built price extractor");
        Ok(extractor)
    }
}
