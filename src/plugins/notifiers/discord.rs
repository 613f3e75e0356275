use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::plugins::traits::NotifierPlugin;
use crate::utils::error::AppError;
use crate::Result;

/// Discord rejects message content longer than this.
pub const MESSAGE_LIMIT: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub mention_role: Option<String>,
    #[serde(default)]
    pub mention_user: Option<String>,
}

fn default_username() -> String {
    "Deal Watcher".to_string()
}

pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, config })
    }

    fn mentions(&self) -> Option<String> {
        let mut content_parts = Vec::new();

        if let Some(role) = &self.config.mention_role {
            content_parts.push(format!("<@&{}>", role));
        }

        if let Some(user) = &self.config.mention_user {
            content_parts.push(format!("<@{}>", user));
        }

        if content_parts.is_empty() {
            None
        } else {
            Some(content_parts.join(" "))
        }
    }

    /// One webhook payload per message-sized chunk of the alert. Mentions go
    /// on the first chunk only.
    fn create_webhook_payloads(&self, markdown: &str) -> Vec<serde_json::Value> {
        let mentions = self.mentions();
        let reserved = mentions.as_ref().map(|m| m.chars().count() + 1).unwrap_or(0);

        split_message(markdown, MESSAGE_LIMIT.saturating_sub(reserved))
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let content = match (&mentions, i) {
                    (Some(mentions), 0) => format!("{}\n{}", mentions, chunk),
                    _ => chunk,
                };

                let mut payload = json!({
                    "content": content,
                    "username": self.config.username,
                });
                if let Some(avatar_url) = &self.config.avatar_url {
                    payload["avatar_url"] = json!(avatar_url);
                }
                payload
            })
            .collect()
    }
}

/// Split on line boundaries into chunks of at most `limit` characters. A
/// single line longer than `limit` is hard-split.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    async fn send(&self, markdown: &str) -> Result<()> {
        for payload in self.create_webhook_payloads(markdown) {
            let response = self
                .client
                .post(&self.config.webhook_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| AppError::transport(self.plugin_type(), e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::transport(
                    self.plugin_type(),
                    format!("webhook returned HTTP {}: {}", status, body),
                ));
            }
        }

        tracing::debug!("Delivered alert to Discord");
        Ok(())
    }
}
