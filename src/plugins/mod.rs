pub mod extractors;
pub mod manager;
pub mod notifiers;
pub mod traits;

pub use manager::PluginManager;
pub use traits::{NotifierPlugin, PriceExtractor};
