use config::{Config, ConfigError, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::Path;
use url::Url;

use crate::plugins::extractors::PriceSelector;
use crate::plugins::notifiers::{DiscordConfig, EmailConfig};

pub const DISCORD_WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub retailers: Vec<RetailerConfig>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// sqlx SQLite URL of the price cache.
    pub database: String,
    pub interval_secs: u64,
    /// Fraction in [0, 1).
    pub min_discount: Decimal,
    pub currency_symbol: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database: "sqlite://prices.db".to_string(),
            interval_secs: 3600,
            min_discount: Decimal::new(1, 1),
            currency_symbol: "£".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub max_concurrent_checks: usize,
    /// Seconds allowed for one extraction.
    pub request_timeout: u64,
    pub user_agent: String,
    pub chrome_path: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_concurrent_checks: 4,
            request_timeout: 30,
            user_agent: concat!("DealWatcher/", env!("CARGO_PKG_VERSION")).to_string(),
            chrome_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Http,
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailerConfig {
    pub key: String,
    pub name: String,
    pub selector: String,
    #[serde(default)]
    pub child_selector: Option<String>,
    #[serde(default)]
    pub render: RenderMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

impl NotificationsConfig {
    pub fn is_empty(&self) -> bool {
        self.discord.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Also write a daily-rotated log file here.
    pub directory: Option<String>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    /// Retailer key to product page URL.
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

impl AppConfig {
    /// Layered load: optional `config/default`, then `path`, then `WATCHER__*`
    /// environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("WATCHER").separator("__"))
            .build()?;

        Self::finish(s.try_deserialize()?)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        Self::finish(s.try_deserialize()?)
    }

    fn finish(mut config: AppConfig) -> Result<Self, ConfigError> {
        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // General
        if self.general.min_discount < Decimal::ZERO || self.general.min_discount >= Decimal::ONE {
            return Err(ConfigError::Message("general.min_discount must be in [0, 1)".into()));
        }

        if self.general.interval_secs == 0 {
            return Err(ConfigError::Message("general.interval_secs must be greater than 0".into()));
        }

        if self.general.database.trim().is_empty() {
            return Err(ConfigError::Message("general.database must not be empty".into()));
        }

        // Scraper
        if self.scraper.max_concurrent_checks == 0 {
            return Err(ConfigError::Message("Scraper max_concurrent_checks must be greater than 0".into()));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        // Retailers
        let mut retailer_keys = HashSet::new();
        let mut retailer_names = HashSet::new();
        for retailer in &self.retailers {
            if !retailer_keys.insert(retailer.key.to_lowercase()) {
                return Err(ConfigError::Message(format!("Duplicate retailer key '{}'", retailer.key)));
            }
            if !retailer_names.insert(retailer.name.as_str()) {
                return Err(ConfigError::Message(format!("Duplicate retailer name '{}'", retailer.name)));
            }
            PriceSelector::new(&retailer.selector, retailer.child_selector.as_deref())
                .map_err(|e| ConfigError::Message(format!("Retailer '{}': {}", retailer.key, e)))?;
        }

        // Products
        let mut product_names = HashSet::new();
        for product in &self.products {
            if !product_names.insert(product.name.as_str()) {
                return Err(ConfigError::Message(format!("Duplicate product name '{}'", product.name)));
            }

            if product.base_price <= Decimal::ZERO {
                return Err(ConfigError::Message(format!(
                    "Product '{}' base_price must be greater than 0",
                    product.name
                )));
            }

            for (key, link) in &product.links {
                if !retailer_keys.contains(&key.to_lowercase()) {
                    return Err(ConfigError::Message(format!(
                        "Product '{}' links to unknown retailer '{}'",
                        product.name, key
                    )));
                }
                if Url::parse(link).is_err() {
                    return Err(ConfigError::Message(format!(
                        "Product '{}' has an invalid URL for '{}': {}",
                        product.name, key, link
                    )));
                }
            }
        }

        // Notifications
        if let Some(discord) = &self.notifications.discord {
            if !discord.webhook_url.starts_with(DISCORD_WEBHOOK_PREFIX) {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        if let Some(email) = &self.notifications.email {
            if email.smtp_port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            for address in [&email.from_email, &email.to_email] {
                if address.parse::<lettre::Address>().is_err() {
                    return Err(ConfigError::Message(format!("Invalid email address '{}'", address)));
                }
            }
        }

        // Metrics
        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}
