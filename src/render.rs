//! Markdown rendering of the notifiable set.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Catalog, ChangeType, NotifiableSet, Observation, Product, ProductId};

const HEADER: &str = "🛍️ **New prices found** 🤑\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub currency_symbol: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            currency_symbol: "£".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertRenderer {
    options: RenderOptions,
}

impl AlertRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render the alert document. Groups are sorted by category label,
    /// products by name, and observations by price then retailer name, so
    /// the output depends only on the contents of `notifiable`.
    pub fn render(&self, notifiable: &NotifiableSet, catalog: &Catalog) -> String {
        if notifiable.values().all(Vec::is_empty) {
            return String::new();
        }

        let mut groups: BTreeMap<&str, Vec<(ProductId, &Product)>> = BTreeMap::new();
        for (&product_id, observations) in notifiable {
            if observations.is_empty() {
                continue;
            }
            let product = catalog.product(product_id);
            groups
                .entry(product.category_label())
                .or_default()
                .push((product_id, product));
        }

        let mut output = String::from(HEADER);
        for (label, mut products) in groups {
            products.sort_by(|(_, a), (_, b)| a.name.cmp(&b.name));

            output.push_str(&format!("### {}\n\n", label));
            for (product_id, product) in products {
                self.render_product(&mut output, product, &notifiable[&product_id], catalog);
            }
        }
        output
    }

    fn render_product(
        &self,
        output: &mut String,
        product: &Product,
        observations: &[Observation],
        catalog: &Catalog,
    ) {
        let mut sorted: Vec<&Observation> = observations.iter().collect();
        sorted.sort_by(|a, b| {
            a.price.cmp(&b.price).then_with(|| {
                catalog
                    .retailer(a.retailer)
                    .name
                    .cmp(&catalog.retailer(b.retailer).name)
            })
        });

        output.push_str(&format!("**{}**\n", product.name));
        output.push_str(&format!("Base price: {}\n", self.money(product.base_price)));

        let mut sorted = sorted.into_iter();
        if let Some(best) = sorted.next() {
            output.push_str(&format!(
                "Best price: {}**{}** at {}\n",
                marker(best),
                self.money(best.price),
                self.suffix(best, product, catalog)
            ));
        }

        let others: Vec<&Observation> = sorted.collect();
        if !others.is_empty() {
            output.push_str("Other prices:\n");
            for observation in others {
                output.push_str(&format!(
                    "- {}{} at {}\n",
                    marker(observation),
                    self.money(observation.price),
                    self.suffix(observation, product, catalog)
                ));
            }
        }
        output.push('\n');
    }

    /// `[Retailer](locator) (-£d.dd | p.pp% off)`
    fn suffix(&self, observation: &Observation, product: &Product, catalog: &Catalog) -> String {
        let discount = product.base_price - observation.price;
        let percentage = if product.base_price.is_zero() {
            Decimal::ZERO
        } else {
            discount / product.base_price * Decimal::ONE_HUNDRED
        };

        format!(
            "[{}]({}) (-{} | {}% off)",
            catalog.retailer(observation.retailer).name,
            observation.locator,
            self.money(discount),
            two_places(percentage)
        )
    }

    fn money(&self, value: Decimal) -> String {
        format!("{}{}", self.options.currency_symbol, two_places(value))
    }
}

fn marker(observation: &Observation) -> &'static str {
    match observation.change_type() {
        ChangeType::New => "🆕 ",
        ChangeType::Increased => "🔺 ",
        ChangeType::Decreased | ChangeType::Unchanged => "",
    }
}

fn two_places(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}
