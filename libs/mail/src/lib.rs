//! Outbound e-mail for the services.

mod memory;
mod smtp;
mod template;

use async_trait::async_trait;
use serde::Deserialize;

pub use memory::InMemoryMailer;
pub use smtp::SmtpMailer;
pub use template::{MailTemplate, render};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("could not connect to SMTP server: {0}")]
    Connect(String),

    #[error("could not send message: {0}")]
    Send(String),

    #[error("could not render template: {0}")]
    Template(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// SMTP settings.
///
/// With `use_ip_whitelist` the relay is trusted to accept mail from our
/// address without authentication, and we greet it as `from_domain`.
#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub from_address: String,
    #[serde(default)]
    pub from_password: Option<String>,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub implicit_tls: bool,
    #[serde(default)]
    pub use_ip_whitelist: bool,
    #[serde(default)]
    pub from_domain: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}
