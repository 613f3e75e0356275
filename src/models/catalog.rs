use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::models::OTHER_CATEGORY;
use crate::plugins::traits::PriceExtractor;
use crate::utils::error::AppError;

/// Index of a product inside its [`Catalog`]. Only the catalog hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(usize);

/// Index of a retailer inside its [`Catalog`]. Only the catalog hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RetailerId(usize);

impl ProductId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl RetailerId {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct Retailer {
    /// Lowercased key that product links refer to.
    pub key: String,
    /// Display name; also the source identifier in the price cache.
    pub name: String,
    extractor: Arc<dyn PriceExtractor>,
}

impl Retailer {
    pub fn extractor(&self) -> &Arc<dyn PriceExtractor> {
        &self.extractor
    }
}

impl fmt::Debug for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retailer")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub name: String,
    pub base_price: Decimal,
    pub category: Option<String>,
    /// Sorted by retailer name.
    pub links: Vec<(RetailerId, String)>,
}

impl Product {
    pub fn category_label(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(OTHER_CATEGORY)
    }
}

/// The retailers and products tracked for the lifetime of the process.
///
/// Built once at startup and shared read-only afterwards. Every id stored in
/// a catalog (and every id it returns) indexes into its own arenas, so the
/// lookups below cannot go out of bounds for ids obtained from the same
/// catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    retailers: Vec<Retailer>,
    products: Vec<Product>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn product(&self, id: ProductId) -> &Product {
        &self.products[id.0]
    }

    pub fn retailer(&self, id: RetailerId) -> &Retailer {
        &self.retailers[id.0]
    }

    pub fn products(&self) -> impl Iterator<Item = (ProductId, &Product)> {
        self.products
            .iter()
            .enumerate()
            .map(|(i, p)| (ProductId(i), p))
    }

    pub fn retailers(&self) -> impl Iterator<Item = (RetailerId, &Retailer)> {
        self.retailers
            .iter()
            .enumerate()
            .map(|(i, r)| (RetailerId(i), r))
    }

    pub fn find_product(&self, name: &str) -> Option<ProductId> {
        self.products
            .iter()
            .position(|p| p.name == name)
            .map(ProductId)
    }

    pub fn find_retailer(&self, key: &str) -> Option<RetailerId> {
        let key = key.to_lowercase();
        self.retailers
            .iter()
            .position(|r| r.key == key)
            .map(RetailerId)
    }

    /// Every (product, retailer, locator) link in catalog order.
    pub fn links(&self) -> impl Iterator<Item = (ProductId, RetailerId, &str)> {
        self.products().flat_map(|(product_id, product)| {
            product
                .links
                .iter()
                .map(move |(retailer_id, locator)| (product_id, *retailer_id, locator.as_str()))
        })
    }

    pub fn link_count(&self) -> usize {
        self.products.iter().map(|p| p.links.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[derive(Default)]
pub struct CatalogBuilder {
    retailers: Vec<Retailer>,
    products: Vec<Product>,
    retailer_index: HashMap<String, RetailerId>,
}

impl CatalogBuilder {
    pub fn add_retailer(
        &mut self,
        key: &str,
        name: &str,
        extractor: Arc<dyn PriceExtractor>,
    ) -> Result<RetailerId, AppError> {
        let key = key.to_lowercase();
        if self.retailer_index.contains_key(&key) {
            return Err(AppError::Validation(format!("Duplicate retailer key: {}", key)));
        }
        if self.retailers.iter().any(|r| r.name == name) {
            return Err(AppError::Validation(format!("Duplicate retailer name: {}", name)));
        }

        let id = RetailerId(self.retailers.len());
        self.retailers.push(Retailer {
            key: key.clone(),
            name: name.to_string(),
            extractor,
        });
        self.retailer_index.insert(key, id);
        Ok(id)
    }

    /// Add a product whose links are given as (retailer key, locator) pairs.
    pub fn add_product<'a, I>(
        &mut self,
        name: &str,
        base_price: Decimal,
        category: Option<&str>,
        links: I,
    ) -> Result<ProductId, AppError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        if self.products.iter().any(|p| p.name == name) {
            return Err(AppError::Validation(format!("Duplicate product name: {}", name)));
        }

        let mut resolved = Vec::new();
        for (key, locator) in links {
            let retailer_id = self
                .retailer_index
                .get(&key.to_lowercase())
                .copied()
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "Product '{}' links to unknown retailer '{}'",
                        name, key
                    ))
                })?;
            resolved.push((retailer_id, locator.to_string()));
        }
        resolved.sort_by(|(a, _), (b, _)| {
            self.retailers[a.0].name.cmp(&self.retailers[b.0].name)
        });

        let id = ProductId(self.products.len());
        self.products.push(Product {
            name: name.to_string(),
            base_price,
            category: category.map(str::to_string),
            links: resolved,
        });
        Ok(id)
    }

    pub fn build(self) -> Catalog {
        Catalog {
            retailers: self.retailers,
            products: self.products,
        }
    }
}
