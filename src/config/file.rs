//! The on-disk TOML config file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{ConfigError, ConfigSource, ConnectionConfig, Layered, Result};

const APP_DIR: &str = "jira-api-client";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Template written when no config file exists yet.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# JIRA connection settings.
#
# Every key can also be provided through the environment
# (JIRA_BASE_URL, JIRA_AUTH_TOKEN, JIRA_USERNAME, JIRA_PASSWORD,
# JIRA_TIMEOUT_MS, JIRA_RETRY_COUNT, JIRA_RETRY_BACKOFF_MS).

# baseUrl = "https://example.atlassian.net"

# Email + API token (Jira Cloud) or user + password use Basic auth.
# A token without a username is sent as a Bearer personal access token.
# username = "you@example.com"
# authToken = "your-api-token"

# timeoutMs = 30000
# retryCount = 3
# retryBackoffMs = 1000
"#;

/// Get the default config file path.
///
/// - Linux: `~/.config/jira-api-client/config.toml`
/// - macOS: `~/Library/Application Support/jira-api-client/config.toml`
/// - Windows: `C:\Users\<User>\AppData\Roaming\jira-api-client\config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// A parsed config file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    table: toml::Table,
}

impl ConfigFile {
    /// Load the config file at `path`, creating it from the template if it
    /// does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::create_default(path)?;
        }
        Self::load(path)
    }

    /// Load and parse the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Reading config file");

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table = toml::from_str::<toml::Table>(&contents)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Write the commented template to `path`, creating parent directories.
    pub fn create_default(path: &Path) -> Result<()> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(io_err)?;

        info!(path = %path.display(), "Created default config file");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build a connection config from this file, with `overrides` taking
    /// precedence over values in the file.
    ///
    /// Missing keys are reported against this file's path.
    pub fn connection<S: ConfigSource>(&self, overrides: S) -> Result<ConnectionConfig> {
        let layered = Layered::new(overrides, &self.table);
        ConnectionConfig::load(&layered).map_err(|e| match e {
            ConfigError::Missing(key) => ConfigError::MissingInFile {
                key,
                path: self.path.clone(),
            },
            other => other,
        })
    }
}

impl ConfigSource for ConfigFile {
    fn get(&self, key: &str) -> Option<String> {
        ConfigSource::get(&self.table, key)
    }
}
