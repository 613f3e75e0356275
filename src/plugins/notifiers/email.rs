use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};

use crate::plugins::traits::NotifierPlugin;
use crate::utils::error::AppError;
use crate::Result;

const SUBJECT: &str = "🛍️ New prices found";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    pub to_email: String,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Deal Watcher".to_string()
}

fn default_use_tls() -> bool {
    true
}

/// Mails the alert as a plain-text message. Markdown reads fine unrendered.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation(format!("Invalid from address: {}", e)))?;
        let to = config
            .to_email
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation(format!("Invalid to address: {}", e)))?;

        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
                .map_err(|e| AppError::Validation(format!("Invalid SMTP server: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
        };

        let mailer = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self { mailer, from, to })
    }

    fn build_message(&self, markdown: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(SUBJECT)
            .header(header::ContentType::TEXT_PLAIN)
            .body(markdown.to_string())
            .map_err(|e| AppError::transport(self.plugin_type(), e))
    }
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    async fn send(&self, markdown: &str) -> Result<()> {
        let message = self.build_message(markdown)?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::transport(self.plugin_type(), e))?;

        tracing::debug!(to = %self.to, "Delivered alert by email");
        Ok(())
    }
}
