use serde::Deserialize;

use audit::AuditSettings;
use auth_check::ProtectedPath;
use common::{DatabaseSettings, LoggingSettings, ServerSettings};

pub const ENV_PREFIX: &str = "PM";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub audit: AuditSettings,
    #[serde(default)]
    pub active_user: ActiveUserSettings,
}

/// Paths, relative to the context path, that require an active user.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveUserSettings {
    #[serde(default = "default_protected")]
    pub protected: Vec<ProtectedPath>,
}

impl Default for ActiveUserSettings {
    fn default() -> Self {
        ActiveUserSettings {
            protected: default_protected(),
        }
    }
}

fn default_protected() -> Vec<ProtectedPath> {
    vec![ProtectedPath {
        path: "/locations".to_string(),
        methods: vec!["POST".to_string()],
    }]
}
