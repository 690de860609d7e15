use async_trait::async_trait;
use mail_builder::MessageBuilder;
use mail_send::SmtpClientBuilder;

use crate::{EmailMessage, MailError, MailSettings, Mailer};

pub struct SmtpMailer {
    settings: MailSettings,
}

impl SmtpMailer {
    pub fn new(settings: MailSettings) -> Self {
        SmtpMailer { settings }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if !self.settings.enabled {
            tracing::debug!("Email disabled, skipping send to {:?}", message.to);
            return Ok(());
        }

        let recipients: Vec<&str> = message.to.iter().map(String::as_str).collect();
        let email = MessageBuilder::new()
            .from(self.settings.from_address.as_str())
            .to(recipients)
            .subject(message.subject.as_str())
            .text_body(message.body.as_str());

        let mut smtp_client = SmtpClientBuilder::new(
            self.settings.smtp_host.as_str(),
            self.settings.smtp_port,
        )
        .implicit_tls(self.settings.implicit_tls);

        if self.settings.use_ip_whitelist {
            if let Some(domain) = &self.settings.from_domain {
                smtp_client = smtp_client.helo_host(domain.as_str());
            }
        } else if let Some(password) = &self.settings.from_password {
            smtp_client = smtp_client
                .credentials((self.settings.from_address.as_str(), password.as_str()));
        }

        let mut client = smtp_client
            .connect()
            .await
            .map_err(|err| MailError::Connect(err.to_string()))?;

        client
            .send(email)
            .await
            .map_err(|err| MailError::Send(err.to_string()))?;

        tracing::info!("Email '{}' sent to {:?}", message.subject, message.to);
        Ok(())
    }
}
