use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::notifiers::{ConsoleNotifier, DiscordNotifier, EmailNotifier};
use super::traits::NotifierPlugin;
use crate::config::NotificationsConfig;
use crate::utils::error::AppError;
use crate::Result;

pub type NotifierPluginBox = Box<dyn NotifierPlugin>;

/// Fans one alert out to every registered notifier.
#[derive(Clone)]
pub struct PluginManager {
    notifiers: Arc<RwLock<BTreeMap<String, NotifierPluginBox>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Register the configured transports. Dry runs, and configurations
    /// without any transport, print to the console instead.
    pub async fn from_config(config: &NotificationsConfig, dry_run: bool) -> Result<Self> {
        let manager = Self::new();

        if dry_run || config.is_empty() {
            manager.register_notifier(Box::new(ConsoleNotifier::new())).await?;
            return Ok(manager);
        }

        if let Some(discord) = &config.discord {
            manager
                .register_notifier(Box::new(DiscordNotifier::new(discord.clone())?))
                .await?;
        }

        if let Some(email) = &config.email {
            manager
                .register_notifier(Box::new(EmailNotifier::new(email)?))
                .await?;
        }

        Ok(manager)
    }

    /// Register a notifier plugin
    pub async fn register_notifier(&self, plugin: NotifierPluginBox) -> Result<()> {
        let plugin_type = plugin.plugin_type().to_string();

        let mut notifiers = self.notifiers.write().await;
        if notifiers.contains_key(&plugin_type) {
            return Err(AppError::Validation(format!(
                "Notifier '{}' is already registered",
                plugin_type
            )));
        }
        tracing::info!(notifier = %plugin.name(), "Registered notifier");
        notifiers.insert(plugin_type, plugin);
        Ok(())
    }

    /// Check if a notifier plugin exists
    pub async fn has_notifier(&self, plugin_type: &str) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.contains_key(plugin_type)
    }

    /// List all registered notifier types
    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        notifiers.keys().cloned().collect()
    }

    /// Deliver to every notifier, even after one fails. Fails if any did.
    pub async fn send_all(&self, markdown: &str) -> Result<()> {
        let notifiers = self.notifiers.read().await;
        if notifiers.is_empty() {
            return Err(AppError::transport("manager", "no notifiers registered"));
        }

        let mut failures = Vec::new();
        for (plugin_type, notifier) in notifiers.iter() {
            if let Err(e) = notifier.send(markdown).await {
                tracing::warn!(notifier = %plugin_type, error = %e, "Notifier failed");
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AppError::transport("manager", failures.join("; ")))
        }
    }

    /// Shutdown all plugins
    pub async fn shutdown(&self) -> Result<()> {
        let mut notifiers = self.notifiers.write().await;
        for (_, plugin) in std::mem::take(&mut *notifiers) {
            if let Err(e) = plugin.shutdown().await {
                tracing::warn!("Error shutting down notifier plugin: {}", e);
            }
        }

        Ok(())
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifierPlugin for PluginManager {
    fn name(&self) -> &str {
        "Plugin Manager"
    }

    fn plugin_type(&self) -> &str {
        "manager"
    }

    async fn send(&self, markdown: &str) -> Result<()> {
        self.send_all(markdown).await
    }

    async fn shutdown(&self) -> Result<()> {
        PluginManager::shutdown(self).await
    }
}
