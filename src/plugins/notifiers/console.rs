use async_trait::async_trait;
use std::io::Write;

use crate::plugins::traits::NotifierPlugin;
use crate::utils::error::AppError;
use crate::Result;

/// Prints the alert to stdout. Used for dry runs and when no remote
/// transport is configured.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifierPlugin for ConsoleNotifier {
    fn name(&self) -> &str {
        "Console Notifier"
    }

    fn plugin_type(&self) -> &str {
        "console"
    }

    async fn send(&self, markdown: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(markdown.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| AppError::transport(self.plugin_type(), e))
    }
}
