use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rust_decimal::Decimal;
use std::ffi::OsStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScraperConfig;
use crate::plugins::extractors::price_text::PriceSelector;
use crate::plugins::traits::PriceExtractor;
use crate::utils::error::{AppError, ExtractionError};

/// A few long-lived headless Chrome instances handed out round-robin.
pub struct BrowserPool {
    browsers: Vec<Arc<Browser>>,
    current_index: AtomicUsize,
    user_agent: String,
}

impl BrowserPool {
    pub fn new(config: &ScraperConfig) -> Result<Self, AppError> {
        let mut browsers = Vec::new();

        // Chrome is heavy; three instances is plenty for a handful of pages.
        for _ in 0..config.max_concurrent_checks.clamp(1, 3) {
            let mut launch_options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .idle_browser_timeout(Duration::from_secs(config.request_timeout.max(1) * 10))
                .args(vec![
                    OsStr::new("--no-sandbox"),
                    OsStr::new("--disable-dev-shm-usage"),
                    OsStr::new("--disable-gpu"),
                    OsStr::new("--disable-extensions"),
                ])
                .build()
                .map_err(|e| AppError::Internal(format!("Failed to create launch options: {}", e)))?;

            if let Some(chrome_path) = &config.chrome_path {
                launch_options.path = Some(std::path::PathBuf::from(chrome_path));
            }

            let browser = Browser::new(launch_options)
                .map_err(|e| AppError::Internal(format!("Failed to launch browser: {}", e)))?;
            browsers.push(Arc::new(browser));
        }

        tracing::info!(instances = browsers.len(), "Started headless browser pool");

        Ok(Self {
            browsers,
            current_index: AtomicUsize::new(0),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn get_browser(&self) -> Arc<Browser> {
        let index = self.current_index.fetch_add(1, Ordering::Relaxed) % self.browsers.len();
        self.browsers[index].clone()
    }
}

/// Renders the product page in headless Chrome before reading the price, for
/// retailers that fill prices in client-side.
pub struct BrowserPriceExtractor {
    pool: Arc<BrowserPool>,
    selector: PriceSelector,
    timeout: Duration,
}

impl BrowserPriceExtractor {
    pub fn new(pool: Arc<BrowserPool>, selector: PriceSelector, timeout_secs: u64) -> Self {
        Self {
            pool,
            selector,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

fn render_page(
    browser: &Browser,
    url: &str,
    user_agent: &str,
    selector: &PriceSelector,
    timeout: Duration,
) -> Result<String, ExtractionError> {
    let tab = browser
        .new_tab()
        .map_err(|e| ExtractionError::Network(format!("Failed to create tab: {}", e)))?;

    let result = load_content(&tab, url, user_agent, selector, timeout);
    let _ = tab.close(true);
    result
}

fn load_content(
    tab: &Tab,
    url: &str,
    user_agent: &str,
    selector: &PriceSelector,
    timeout: Duration,
) -> Result<String, ExtractionError> {
    tab.set_default_timeout(timeout);
    tab.set_user_agent(user_agent, None, None)
        .map_err(|e| ExtractionError::Network(format!("Failed to set user agent: {}", e)))?;

    tab.navigate_to(url)
        .and_then(|tab| tab.wait_until_navigated())
        .map_err(|e| ExtractionError::Network(format!("Navigation failed: {}", e)))?;

    tab.wait_for_element_with_custom_timeout(selector.selector(), timeout)
        .map_err(|_| ExtractionError::NotFound {
            selector: selector.selector().to_string(),
        })?;

    tab.get_content()
        .map_err(|e| ExtractionError::Network(format!("Failed to get page content: {}", e)))
}

#[async_trait]
impl PriceExtractor for BrowserPriceExtractor {
    async fn extract_price(&self, locator: &str) -> Result<Decimal, ExtractionError> {
        let browser = self.pool.get_browser();
        let user_agent = self.pool.user_agent.clone();
        let selector = self.selector.clone();
        let url = locator.to_string();
        let timeout = self.timeout;

        // headless_chrome blocks on the devtools socket.
        let content = tokio::task::spawn_blocking(move || {
            render_page(&browser, &url, &user_agent, &selector, timeout)
        })
        .await
        .map_err(|e| ExtractionError::Network(format!("Browser task failed: {}", e)))??;

        let price = self.selector.extract(&content)?;
        tracing::debug!(url = %locator, price = %price, "Extracted price from rendered page");
        Ok(price)
    }
}
