pub mod extractor;
pub mod notifier;

pub use extractor::PriceExtractor;
pub use notifier::NotifierPlugin;
