use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::models::{Catalog, Observation, ObservationsByProduct, ProductId, RetailerId, ScrapeFailure};
use crate::store::{CacheKey, PriceRecord, PriceSnapshot};
use crate::utils::error::ExtractionError;

/// Everything one pass over the catalog produced.
#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    /// Every catalog product has an entry. Order within an entry is
    /// completion order and carries no meaning.
    pub observations: ObservationsByProduct,
    pub failures: Vec<ScrapeFailure>,
}

impl ScrapeOutcome {
    pub fn observation_count(&self) -> usize {
        self.observations.values().map(Vec::len).sum()
    }

    /// Cache rows for every successful extraction.
    pub fn price_records(&self, catalog: &Catalog, scraped_at: DateTime<Utc>) -> Vec<PriceRecord> {
        self.observations
            .iter()
            .flat_map(|(&product_id, observations)| {
                let product = catalog.product(product_id);
                observations.iter().map(move |o| PriceRecord {
                    retailer: catalog.retailer(o.retailer).name.clone(),
                    product: product.name.clone(),
                    price: o.price,
                    scraped_at,
                })
            })
            .collect()
    }
}

/// Extracts a price for every (product, retailer) link in the catalog.
#[derive(Debug, Clone)]
pub struct ScrapeOrchestrator {
    max_concurrent: usize,
    timeout: Duration,
}

impl ScrapeOrchestrator {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            timeout,
        }
    }

    /// One failed link never affects its siblings; it just lands in
    /// `failures` instead of `observations`.
    pub async fn run(&self, catalog: &Catalog, snapshot: &PriceSnapshot) -> ScrapeOutcome {
        let links: Vec<(ProductId, RetailerId, String)> = catalog
            .links()
            .map(|(product_id, retailer_id, locator)| (product_id, retailer_id, locator.to_string()))
            .collect();

        // Owned locators keep the stream `Send` for callers behind async_trait.
        let extractions = links.into_iter().map(|(product_id, retailer_id, locator)| async move {
            self.extract_one(catalog, snapshot, product_id, retailer_id, &locator)
                .await
        });

        let results: Vec<_> = stream::iter(extractions)
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut outcome = ScrapeOutcome {
            observations: catalog.products().map(|(id, _)| (id, Vec::new())).collect(),
            failures: Vec::new(),
        };

        for (product_id, result) in results {
            match result {
                Ok(observation) => outcome
                    .observations
                    .entry(product_id)
                    .or_default()
                    .push(observation),
                Err(failure) => outcome.failures.push(failure),
            }
        }

        tracing::debug!(
            observations = outcome.observation_count(),
            failures = outcome.failures.len(),
            "Scrape pass finished"
        );
        outcome
    }

    async fn extract_one(
        &self,
        catalog: &Catalog,
        snapshot: &PriceSnapshot,
        product_id: ProductId,
        retailer_id: RetailerId,
        locator: &str,
    ) -> (ProductId, Result<Observation, ScrapeFailure>) {
        let retailer = catalog.retailer(retailer_id);
        let product = catalog.product(product_id);

        let extraction = tokio::time::timeout(self.timeout, retailer.extractor().extract_price(locator)).await;
        let result = match extraction {
            Ok(Ok(price)) => {
                let cached_price = snapshot
                    .get(&CacheKey::new(&retailer.name, &product.name))
                    .copied();
                Ok(Observation {
                    retailer: retailer_id,
                    price,
                    locator: locator.to_string(),
                    cached_price,
                })
            }
            Ok(Err(error)) => Err(error),
            Err(_) => Err(ExtractionError::Timeout(self.timeout.as_secs())),
        };

        let result = result.map_err(|error| {
            tracing::debug!(
                product = %product.name,
                retailer = %retailer.name,
                url = %locator,
                error = %error,
                "Price extraction failed"
            );
            ScrapeFailure {
                product: product_id,
                retailer: retailer_id,
                error,
            }
        });

        (product_id, result)
    }
}
