pub mod catalog;
pub mod observation;

// Re-exports for convenience
pub use catalog::*;
pub use observation::*;

/// Group label for products configured without a category.
pub const OTHER_CATEGORY: &str = "Other";
