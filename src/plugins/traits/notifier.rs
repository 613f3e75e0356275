use async_trait::async_trait;

use crate::Result;

/// Trait for implementing alert transports (console, Discord, email, etc.)
///
/// The alert document is markdown and is delivered as one opaque unit; a
/// transport may split it into several messages if its protocol has a size
/// limit, but it must not reorder or drop content.
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;

    async fn send(&self, markdown: &str) -> Result<()>;

    /// Plugin lifecycle
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
