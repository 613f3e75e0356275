use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::utils::error::ExtractionError;

/// Turns a retailer-specific locator (usually a product page URL) into the
/// price currently shown there.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceExtractor: Send + Sync {
    async fn extract_price(&self, locator: &str) -> Result<Decimal, ExtractionError>;
}
