use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

const DEFAULT_REGISTRY: &str = "ghcr.io";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Account used for both `git clone` and the registry login.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub registry: String,
    pub bind_addr: SocketAddr,
    pub work_dir: PathBuf,
    pub git_bin: String,
    pub docker_bin: String,
}

impl Config {
    /// Reads the service configuration from the process environment.
    ///
    /// `.env` is expected to be loaded by the caller before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let credentials = Credentials {
            user: required("GITHUB_USER")?,
            token: required("GITHUB_TOKEN")?,
        };

        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: format!("{bind_raw}: {e}"),
            })?;

        let work_dir = lookup("WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("cd-webhook"));

        Ok(Config {
            credentials,
            registry: lookup("REGISTRY").unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
            bind_addr,
            work_dir,
            git_bin: lookup("GIT_BIN").unwrap_or_else(|| "git".to_string()),
            docker_bin: lookup("DOCKER_BIN").unwrap_or_else(|| "docker".to_string()),
        })
    }
}
