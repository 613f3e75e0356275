//! Decides which observations are worth an alert.
//!
//! A first sighting is notable when it is at least `min_discount` below the
//! product's base price. After that, a price that is already discounted only
//! re-alerts once it moves by at least `min_discount` relative to the cached
//! price (a deadband), unless it has just crossed into discount territory.

use rust_decimal::Decimal;

use crate::models::{Catalog, NotifiableSet, ObservationsByProduct};
use crate::utils::error::AppError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotabilityFilter {
    min_discount: Decimal,
}

impl NotabilityFilter {
    /// `min_discount` is a fraction in `[0, 1)`.
    pub fn new(min_discount: Decimal) -> Result<Self> {
        if min_discount < Decimal::ZERO || min_discount >= Decimal::ONE {
            return Err(AppError::Validation(format!(
                "min_discount must be in [0, 1), got {}",
                min_discount
            )));
        }
        Ok(Self { min_discount })
    }

    pub fn min_discount(&self) -> Decimal {
        self.min_discount
    }

    /// Keep, per product, exactly the notable observations. Products with
    /// none are left out of the result.
    pub fn filter(&self, observations: &ObservationsByProduct, catalog: &Catalog) -> NotifiableSet {
        observations
            .iter()
            .filter_map(|(&product_id, product_observations)| {
                let product = catalog.product(product_id);
                let base_threshold = product.base_price * (Decimal::ONE - self.min_discount);

                let notable: Vec<_> = product_observations
                    .iter()
                    .filter(|o| is_notable(o.price, o.cached_price, base_threshold, self.min_discount))
                    .cloned()
                    .collect();

                if notable.is_empty() {
                    None
                } else {
                    Some((product_id, notable))
                }
            })
            .collect()
    }
}

/// All comparisons are inclusive. An unchanged price is always inside the
/// band, which matters when `min_discount` is zero and the band collapses
/// onto the cached price.
pub fn is_notable(
    price: Decimal,
    cached_price: Option<Decimal>,
    base_threshold: Decimal,
    min_discount: Decimal,
) -> bool {
    let Some(cached) = cached_price else {
        return price <= base_threshold;
    };

    let lower = cached * (Decimal::ONE - min_discount);
    let upper = cached * (Decimal::ONE + min_discount);

    let dropped_below_base = price <= base_threshold && cached > base_threshold;
    let outside_band = price != cached && (price <= lower || price >= upper);

    dropped_below_base || (outside_band && price <= base_threshold)
}
