use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::registry::{RegistryConfig, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS};

pub const URL_ENV_VAR: &str = "INVENTORY_AGENT_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub server_url: String,
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AgentConfig {
    /// `<config dir>/inventory-agent/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("inventory-agent").join("config.yaml"))
    }

    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File, then environment, then the command-line URL.
    pub fn resolve(url_flag: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(env::var(URL_ENV_VAR).ok().as_deref(), url_flag);
        Ok(config)
    }

    fn apply_overrides(&mut self, env_url: Option<&str>, url_flag: Option<&str>) {
        if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
        if let Some(url) = url_flag.filter(|u| !u.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig::new(self.server_url.clone(), Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load_from(&dir.path().join("config.yaml")).unwrap();

        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.registry().timeout, Duration::from_secs(10));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_url: http://inventory.prefeitura.local:3000").unwrap();

        let config = AgentConfig::load_from(file.path()).unwrap();

        assert_eq!(config.server_url, "http://inventory.prefeitura.local:3000");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs: [not, a, number]").unwrap();

        assert!(matches!(AgentConfig::load_from(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn flag_beats_environment_beats_file() {
        let mut config = AgentConfig::default();
        config.apply_overrides(Some("http://from-env:3000"), None);
        assert_eq!(config.server_url, "http://from-env:3000");

        config.apply_overrides(Some("http://from-env:3000"), Some("http://from-flag:3000"));
        assert_eq!(config.server_url, "http://from-flag:3000");

        config.apply_overrides(Some("  "), None);
        assert_eq!(config.server_url, "http://from-flag:3000");
    }
}
