use serde::Deserialize;

use audit::AuditSettings;
use auth_check::IntrospectionSettings;
use common::{DatabaseSettings, LoggingSettings, ServerSettings};

pub const ENV_PREFIX: &str = "ENROLL";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: IntrospectionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub audit: AuditSettings,
}
