//! Logging configuration using the tracing ecosystem.
//!
//! Log records go to a daily rotating file so that command output on stdout
//! stays clean. The filter comes from `RUST_LOG` when set.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log filter if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "jira_api_client=info,warn";

/// Filter used with `--verbose` when RUST_LOG is not set.
const VERBOSE_LOG_FILTER: &str = "jira_api_client=debug,info";

const LOG_FILE_PREFIX: &str = "jira-api-client.log";

/// Initialize the logging system.
///
/// Logs are stored in the platform-specific local data directory:
/// - Linux: `~/.local/share/jira-api-client/logs/`
/// - macOS: `~/Library/Application Support/jira-api-client/logs/`
/// - Windows: `C:\Users\<User>\AppData\Local\jira-api-client\logs\`
///
/// Request spans (`jira_request`) carry the method, path and attempt number,
/// so `RUST_LOG=jira_api_client=debug` shows every retry.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(verbose: bool) -> anyhow::Result<PathBuf> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "jira-api-client starting up");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(log_dir)
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    }
}

fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("jira-api-client").join("logs"))
}

/// Log application shutdown.
pub fn shutdown() {
    tracing::info!("jira-api-client shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_has_expected_structure() {
        let dir = get_log_directory().unwrap();
        assert!(dir.ends_with("jira-api-client/logs"));
    }

    #[test]
    fn test_default_filter_selection() {
        assert_eq!(default_filter(false), DEFAULT_LOG_FILTER);
        assert_eq!(default_filter(true), VERBOSE_LOG_FILTER);
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        assert!(EnvFilter::try_new(VERBOSE_LOG_FILTER).is_ok());
    }
}
