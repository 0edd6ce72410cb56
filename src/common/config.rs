//! Configuration file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::{config_path, project_config_path};
use super::Result;
use crate::scenario::ResponseType;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Execution settings shared by every suite in a run
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Default settings
#[derive(Debug, Deserialize, Default)]
pub struct Defaults {
    /// Base URL used by suites that do not set their own
    pub base_url: Option<String>,

    /// Response type for scenarios that do not declare one
    #[serde(default)]
    pub response_type: ResponseType,
}

/// Timeout settings
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Time allowed for one assertion phase to settle
    #[serde(default = "default_phase_ms")]
    pub phase_ms: u64,

    /// Time allowed for a single fetch
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            phase_ms: default_phase_ms(),
            request_secs: default_request_secs(),
        }
    }
}

fn default_phase_ms() -> u64 {
    30_000
}
fn default_request_secs() -> u64 {
    30
}

/// Execution settings
#[derive(Debug, Deserialize)]
pub struct ExecutionConfig {
    /// Run browser-driven scenarios without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Environment name exposed to scenarios (e.g. "staging")
    pub environment: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            environment: None,
        }
    }
}

fn default_headless() -> bool {
    true
}

impl Config {
    /// Load configuration, preferring `./flagrun.toml` over the user config
    ///
    /// Returns default configuration if neither file exists
    pub fn load() -> Result<Self> {
        let candidates = [Some(project_config_path()), config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

/// Process-wide execution options
///
/// Built once before any suite creates scenarios and handed down from the
/// suite to each scenario at creation time. Never mutated during a run.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Run browser-driven scenarios headless
    pub headless: bool,
    /// Optional environment name
    pub environment: Option<String>,
    /// Time allowed for each assertion phase to settle
    pub phase_timeout: Duration,
    /// Default request timeout
    pub request_timeout: Duration,
    /// Response type used when a scenario does not declare one
    pub default_response_type: ResponseType,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ExecutionOptions {
    /// Derive execution options from a loaded config
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.execution.headless,
            environment: config.execution.environment.clone(),
            phase_timeout: Duration::from_millis(config.timeouts.phase_ms),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            default_response_type: config.defaults.response_type,
        }
    }

    /// Override the phase timeout
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timeouts.phase_ms, 30_000);
        assert!(config.execution.headless);
        assert_eq!(config.defaults.response_type, ResponseType::Html);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[defaults]
base_url = "https://example.com"
response_type = "json"

[timeouts]
phase_ms = 500

[execution]
headless = false
environment = "staging"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.defaults.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.defaults.response_type, ResponseType::Json);
        assert_eq!(config.timeouts.phase_ms, 500);
        assert_eq!(config.timeouts.request_secs, 30);

        let options = ExecutionOptions::from_config(&config);
        assert!(!options.headless);
        assert_eq!(options.phase_timeout, Duration::from_millis(500));
        assert_eq!(options.environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeouts]\nphase_ms = \"soon\"").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(crate::Error::ConfigParse(_))
        ));
    }
}
