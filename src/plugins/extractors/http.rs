use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::plugins::extractors::price_text::PriceSelector;
use crate::plugins::traits::PriceExtractor;
use crate::utils::error::{AppError, ExtractionError};

/// Fetches the product page over plain HTTP and reads the price out of the
/// static markup. Suits retailers that render prices server-side.
pub struct HttpPriceExtractor {
    client: Client,
    selector: PriceSelector,
    timeout_secs: u64,
}

impl HttpPriceExtractor {
    pub fn new(selector: PriceSelector, user_agent: &str, timeout_secs: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            selector,
            timeout_secs,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, ExtractionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Network(format!("{} returned HTTP {}", url, status)));
        }

        response.text().await.map_err(|e| self.request_error(e))
    }

    fn request_error(&self, err: reqwest::Error) -> ExtractionError {
        if err.is_timeout() {
            ExtractionError::Timeout(self.timeout_secs)
        } else {
            ExtractionError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl PriceExtractor for HttpPriceExtractor {
    async fn extract_price(&self, locator: &str) -> Result<Decimal, ExtractionError> {
        let body = self.fetch(locator).await?;
        let price = self.selector.extract(&body)?;
        tracing::debug!(url = %locator, price = %price, "Extracted price over HTTP");
        Ok(price)
    }
}
