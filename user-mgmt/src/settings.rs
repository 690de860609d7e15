use serde::Deserialize;

use audit::AuditSettings;
use auth_check::IntrospectionSettings;
use common::{LoggingSettings, ServerSettings};
use mail::{MailSettings, MailTemplate};

pub const ENV_PREFIX: &str = "USER_MGMT";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub auth: IntrospectionSettings,
    pub mail: MailSettings,
    pub feedback: MailContent,
    pub contact_us: MailContent,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub audit: AuditSettings,
}

/// Recipient and templates of one kind of outgoing mail.
#[derive(Debug, Clone, Deserialize)]
pub struct MailContent {
    pub to: String,
    #[serde(flatten)]
    pub template: MailTemplate,
}
