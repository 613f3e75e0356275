pub mod app;
pub mod config;
pub mod cycle;
pub mod filter;
pub mod logging;
pub mod models;
pub mod plugins;
pub mod render;
pub mod scheduler;
pub mod scraper;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use app::App;
pub use config::AppConfig;
pub use cycle::{CycleReport, CycleRunner};
pub use utils::error::{AppError, ExtractionError};

pub type Result<T> = std::result::Result<T, AppError>;
