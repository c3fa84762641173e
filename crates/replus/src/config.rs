//! Configuration file support for replus.
//!
//! Loads configuration from `replus.toml` in the working directory. Every
//! setting can be overridden from the command line.

use anyhow::{Context, Result};
use replus_db::Database;
use replus_logging::LogFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "replus.toml";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Two weeks.
pub const DEFAULT_TOKEN_TTL_HOURS: u32 = 336;

/// Written by `replus init`.
pub const DEFAULT_CONFIG: &str = r#"# replus configuration

# Log level filter (overridden by RUST_LOG)
log_level = "info"
# One of: pretty, json, compact
log_format = "pretty"

[server]
host = "127.0.0.1"
port = 8000

[database]
# Defaults to the platform data directory, e.g. ~/.local/share/replus/replus.db
# path = "replus.db"

[auth]
# How long a login token stays valid
token_ttl_hours = 336
"#;

/// Configuration loaded from `replus.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ReplusConfig {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Relative paths resolve against the working directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub token_ttl_hours: Option<u32>,
}

impl ReplusConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ReplusConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Write [`DEFAULT_CONFIG`] into `working_dir`.
    ///
    /// An existing file is only replaced when `force` is set.
    pub fn write_default(working_dir: &Path, force: bool) -> Result<PathBuf> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() && !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            );
        }

        std::fs::write(&config_path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        Ok(config_path)
    }
}

/// Values given on the command line. `None` falls back to the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

/// Effective server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    pub token_ttl: chrono::Duration,
}

impl Settings {
    /// Priority: command line > config file > built-in default
    pub fn resolve(config: &ReplusConfig, overrides: Overrides, working_dir: &Path) -> Self {
        let database = overrides
            .database
            .or_else(|| config.database.path.clone())
            .map(|path| working_dir.join(path))
            .unwrap_or_else(Database::default_path);

        let ttl_hours = config
            .auth
            .token_ttl_hours
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        Self {
            host: overrides
                .host
                .or_else(|| config.server.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides
                .port
                .or(config.server.port)
                .unwrap_or(DEFAULT_PORT),
            database,
            log_level: overrides
                .log_level
                .or_else(|| config.log_level.clone())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format: overrides
                .log_format
                .or(config.log_format)
                .unwrap_or_default(),
            token_ttl: chrono::Duration::hours(i64::from(ttl_hours)),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ReplusConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
log_level = "debug"
log_format = "json"

[server]
host = "0.0.0.0"
port = 9000

[database]
path = "data/replus.db"

[auth]
token_ttl_hours = 24
"#,
        )
        .unwrap();

        let config = ReplusConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_format, Some(LogFormat::Json));
        assert_eq!(config.server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.server.port, Some(9000));
        assert_eq!(config.database.path, Some(PathBuf::from("data/replus.db")));
        assert_eq!(config.auth.token_ttl_hours, Some(24));
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[server]\nhostname = \"x\"\n",
        )
        .unwrap();

        assert!(ReplusConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_default_config_parses() {
        let config: ReplusConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.port, Some(DEFAULT_PORT));
        assert_eq!(config.log_format, Some(LogFormat::Pretty));
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = ReplusConfig::write_default(dir.path(), false).unwrap();
        assert!(path.exists());

        assert!(ReplusConfig::write_default(dir.path(), false).is_err());
        assert!(ReplusConfig::write_default(dir.path(), true).is_ok());
    }

    #[test]
    fn test_resolve_priority() {
        let config: ReplusConfig = toml::from_str(
            r#"
log_level = "warn"

[server]
port = 9000

[database]
path = "from-file.db"
"#,
        )
        .unwrap();
        let working_dir = Path::new("/srv/replus");

        let settings = Settings::resolve(
            &config,
            Overrides {
                port: Some(9100),
                ..Default::default()
            },
            working_dir,
        );

        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert_eq!(settings.database, PathBuf::from("/srv/replus/from-file.db"));
        assert_eq!(settings.token_ttl, chrono::Duration::hours(336));
        assert_eq!(settings.addr(), "127.0.0.1:9100");
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(
            &ReplusConfig::default(),
            Overrides::default(),
            Path::new("."),
        );
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(settings.database, Database::default_path());
    }
}
