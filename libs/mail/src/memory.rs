use std::sync::Mutex;

use async_trait::async_trait;

use crate::{EmailMessage, MailError, Mailer};

/// Collects messages instead of sending them.
#[derive(Debug, Default)]
pub struct InMemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: bool,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        InMemoryMailer::default()
    }

    pub fn failing() -> Self {
        InMemoryMailer {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError::Connect("smtp server unreachable".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Send("mailbox lock poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}
