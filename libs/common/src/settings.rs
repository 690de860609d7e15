use std::path::PathBuf;

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Exports a `.env` file into the process environment, returning its path.
/// Call before [`load_settings`] so its variables take part in the overrides.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Loads a service's settings once at startup.
///
/// Sources, later ones winning:
/// * `config/<service>.toml`, if present,
/// * environment variables `<PREFIX>_<SECTION>__<KEY>`, e.g. `PM_DATABASE__URL`.
pub fn load_settings<T: DeserializeOwned>(
    service: &str,
    env_prefix: &str,
) -> Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(&format!("config/{}", service)).required(false))
        .add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub context_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            port: default_port(),
            context_path: String::new(),
        }
    }
}

impl ServerSettings {
    /// Context path with a single leading slash and no trailing one.
    /// The root context is the empty string.
    pub fn context_path(&self) -> String {
        let trimmed = self.context_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: default_level(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_path_is_normalized() {
        let server = ServerSettings {
            port: 8080,
            context_path: "participant-manager-datastore/".to_string(),
        };
        assert_eq!(server.context_path(), "/participant-manager-datastore");
        assert_eq!(server.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn root_context_path_is_empty() {
        let server = ServerSettings {
            port: 3000,
            context_path: "/".to_string(),
        };
        assert_eq!(server.context_path(), "");
    }
}
