use serde::Deserialize;

use common::{DatabaseSettings, LoggingSettings};

pub const ENV_PREFIX: &str = "AUDIT_WRITER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub queue: QueueSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    pub url: String,
    /// Messages fetched per receive call, at most 10.
    #[serde(default = "default_batch_size")]
    pub batch_size: i32,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_batch_size() -> i32 {
    10
}

fn default_poll_interval_secs() -> u64 {
    5
}
