//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! command line flags and their environment variables.

use std::path::Path;

use anyhow::{Context, Result};
use ::config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://villa.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Effective configuration of the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values from flags or their environment variables, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
}

impl AppConfig {
    /// Load defaults and, when given, the TOML file at `path`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("database.max_connections", i64::from(DEFAULT_MAX_CONNECTIONS))?
            .set_default("logging.level", "info")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let built = builder
            .build()
            .with_context(|| match path {
                Some(path) => format!("loading config from {}", path.display()),
                None => "building default config".to_string(),
            })?;

        built.try_deserialize().context("parsing config")
    }

    /// Apply flag and environment overrides on top of the loaded values.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(origins) = overrides.allowed_origins {
            self.cors.allowed_origins = normalize_origins(origins);
        }
    }

    /// Listen address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing config to TOML")
    }
}

/// Trim origins and drop empty entries, so `ALLOWED_ORIGINS=""` means any origin.
pub fn normalize_origins(origins: Vec<String>) -> Vec<String> {
    origins
        .into_iter()
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
        assert_eq!(config.database.url, "sqlite://villa.db");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.cors.allowed_origins.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080

[database]
max_connections = 12

[cors]
allowed_origins = ["https://villa.tv"]
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.cors.allowed_origins, vec!["https://villa.tv"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(AppConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_overrides(ConfigOverrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(4000),
            database_url: Some("sqlite::memory:".to_string()),
            allowed_origins: Some(vec![
                " https://a.example ".to_string(),
                String::new(),
                "https://b.example".to_string(),
            ]),
        });

        assert_eq!(config.bind_address(), "127.0.0.1:4000");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_absent_overrides_keep_values() {
        let mut config = AppConfig::default();
        config.server.port = 9000;
        config.apply_overrides(ConfigOverrides::default());
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_toml_output_round_trips_through_load() {
        let mut config = AppConfig::default();
        config.server.port = 4321;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();

        assert_eq!(AppConfig::load(Some(file.path())).unwrap(), config);
    }
}
