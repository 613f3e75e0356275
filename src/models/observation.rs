use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{ProductId, RetailerId};
use crate::utils::error::ExtractionError;

/// One successful price extraction within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub retailer: RetailerId,
    pub price: Decimal,
    pub locator: String,
    /// Price cached for this (retailer, product) pair at cycle start.
    pub cached_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeType {
    New,
    Increased,
    Decreased,
    Unchanged,
}

impl Observation {
    pub fn change_type(&self) -> ChangeType {
        match self.cached_price {
            None => ChangeType::New,
            Some(cached) if self.price > cached => ChangeType::Increased,
            Some(cached) if self.price < cached => ChangeType::Decreased,
            Some(_) => ChangeType::Unchanged,
        }
    }
}

/// A link whose extraction failed this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeFailure {
    pub product: ProductId,
    pub retailer: RetailerId,
    pub error: ExtractionError,
}

/// Per-product observations for one cycle. Every catalog product has an
/// entry, possibly empty.
pub type ObservationsByProduct = BTreeMap<ProductId, Vec<Observation>>;

/// Per-product notable observations. Products without any are absent.
pub type NotifiableSet = BTreeMap<ProductId, Vec<Observation>>;
