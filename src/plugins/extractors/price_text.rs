use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::store::to_minor_units;
use crate::utils::error::{AppError, ExtractionError};

// Either a comma-grouped amount ("1,299.99") or a plain one ("1299.99").
static PRICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\$£€¥₹]?\s*(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)")
        .expect("price regex is valid")
});

/// Pull the first amount out of free text such as `"Now £12.50"`. Amounts
/// too large for the price cache are rejected here, so they fail only the
/// link they came from.
pub fn parse_price(text: &str) -> Result<Decimal, ExtractionError> {
    let text = text.trim();
    let parse_error = || ExtractionError::Parse {
        text: text.to_string(),
    };

    let captures = PRICE_REGEX.captures(text).ok_or_else(parse_error)?;
    let amount = captures.get(1).ok_or_else(parse_error)?.as_str().replace(',', "");
    let price = Decimal::from_str(&amount).map_err(|_| parse_error())?;
    to_minor_units(price).map_err(|_| parse_error())?;
    Ok(price)
}

/// Where the price lives on a product page: the text of the first element
/// matching `selector`, or of its first descendant matching `child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSelector {
    selector: String,
    child: Option<String>,
}

impl PriceSelector {
    pub fn new(selector: &str, child: Option<&str>) -> Result<Self, AppError> {
        Selector::parse(selector)
            .map_err(|e| AppError::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))?;
        if let Some(child) = child {
            Selector::parse(child)
                .map_err(|e| AppError::Validation(format!("Invalid CSS selector '{}': {:?}", child, e)))?;
        }

        Ok(Self {
            selector: selector.to_string(),
            child: child.map(str::to_string),
        })
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Text of the price element in `html`, whitespace-trimmed.
    pub fn select_text(&self, html: &str) -> Result<String, ExtractionError> {
        let document = Html::parse_document(html);
        let element = first_match(document.root_element(), &self.selector)?;

        let element = match &self.child {
            Some(child) => first_match(element, child)?,
            None => element,
        };

        Ok(element.text().collect::<String>().trim().to_string())
    }

    pub fn extract(&self, html: &str) -> Result<Decimal, ExtractionError> {
        parse_price(&self.select_text(html)?)
    }
}

fn first_match<'a>(scope: ElementRef<'a>, selector: &str) -> Result<ElementRef<'a>, ExtractionError> {
    let not_found = || ExtractionError::NotFound {
        selector: selector.to_string(),
    };
    let parsed = Selector::parse(selector).map_err(|_| not_found())?;
    scope.select(&parsed).next().ok_or_else(not_found)
}
