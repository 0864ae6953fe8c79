//! Key/value configuration sources.

use std::collections::HashMap;

use super::{
    KEY_AUTH_TOKEN, KEY_BASE_URL, KEY_PASSWORD, KEY_RETRY_BACKOFF_MS, KEY_RETRY_COUNT,
    KEY_TIMEOUT_MS, KEY_USERNAME,
};

/// A read-only source of configuration values.
///
/// Values are returned as strings; typed parsing happens in
/// [`ConnectionConfig::load`](super::ConnectionConfig::load).
pub trait ConfigSource {
    /// Look up the raw value for `key`.
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigSource for toml::Table {
    fn get(&self, key: &str) -> Option<String> {
        match toml::Table::get(self, key)? {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Reads configuration from `JIRA_*` environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl EnvSource {
    /// The environment variable consulted for a configuration key.
    pub fn var_name(key: &str) -> Option<&'static str> {
        let name = match key {
            KEY_BASE_URL => "JIRA_BASE_URL",
            KEY_AUTH_TOKEN => "JIRA_AUTH_TOKEN",
            KEY_USERNAME => "JIRA_USERNAME",
            KEY_PASSWORD => "JIRA_PASSWORD",
            KEY_TIMEOUT_MS => "JIRA_TIMEOUT_MS",
            KEY_RETRY_COUNT => "JIRA_RETRY_COUNT",
            KEY_RETRY_BACKOFF_MS => "JIRA_RETRY_BACKOFF_MS",
            _ => return None,
        };
        Some(name)
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        Self::var_name(key).and_then(|name| std::env::var(name).ok())
    }
}

/// Two sources consulted in order: the primary wins when it has a value.
#[derive(Debug, Clone)]
pub struct Layered<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> Layered<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ConfigSource, F: ConfigSource> ConfigSource for Layered<P, F> {
    fn get(&self, key: &str) -> Option<String> {
        self.primary
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.fallback.get(key))
    }
}
