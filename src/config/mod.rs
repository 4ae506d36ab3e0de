//! Configuration management
//!
//! Both binaries load a YAML file: the driver from `openvox-noop.yaml`, the
//! agent from `agent.yaml`. An explicit `--config` path or environment
//! variable wins over the search path. A missing configuration file is fatal
//! at startup.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::cm_hooks::HooksConfig;
use crate::services::puppet::PuppetConfig;

/// Driver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriverConfig {
    /// Remote URL of the configuration code repository
    pub repo_url: String,

    /// Local clone used for walking commit ranges
    #[serde(default = "default_driver_repo_dir")]
    pub repo_dir: PathBuf,

    /// SSH private key file for the remote, when it is not anonymous
    #[serde(default)]
    pub ssh_private_key_file: Option<PathBuf>,

    /// Root of the on-disk report cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Port agents listen on
    #[serde(default = "default_agent_port")]
    pub agent_port: u16,

    /// Per-request apply deadline in seconds
    #[serde(default = "default_apply_timeout")]
    pub apply_timeout_secs: u64,

    /// Change-management hook providers
    #[serde(default)]
    pub hooks: HooksConfig,
}

/// Agent configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Listen address
    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// Listen port
    #[serde(default = "default_agent_port")]
    pub listen_port: u16,

    /// Agent state directory; the code repository clone lives underneath
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Remote URL of the configuration code repository
    pub repo_url: String,

    /// SSH private key file for the remote, when it is not anonymous
    #[serde(default)]
    pub ssh_private_key_file: Option<PathBuf>,

    /// Configuration tool settings
    #[serde(default)]
    pub puppet: PuppetConfig,
}

fn default_driver_repo_dir() -> PathBuf {
    PathBuf::from("/var/lib/openvox-noop/repo/puppetcode")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("/var/lib/openvox-noop/noops")
}

fn default_agent_port() -> u16 {
    4480
}

fn default_apply_timeout() -> u64 {
    300
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/openvox-noop-agent")
}

impl DriverConfig {
    /// Load the driver configuration, from `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        read_config(path, "OPENVOX_NOOP_CONFIG", "openvox-noop.yaml")
    }

    /// Read the configured SSH private key, if any
    pub fn ssh_key(&self) -> Result<Option<String>> {
        read_ssh_key(self.ssh_private_key_file.as_deref())
    }
}

impl AgentConfig {
    /// Load the agent configuration, from `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        read_config(path, "OPENVOX_NOOP_AGENT_CONFIG", "agent.yaml")
    }

    /// Local path of the code repository clone
    pub fn repo_dir(&self) -> PathBuf {
        self.state_dir.join("repo/puppetcode")
    }

    /// Read the configured SSH private key, if any
    pub fn ssh_key(&self) -> Result<Option<String>> {
        read_ssh_key(self.ssh_private_key_file.as_deref())
    }
}

fn read_config<T: serde::de::DeserializeOwned>(
    path: Option<&Path>,
    env_var: &str,
    file_name: &str,
) -> Result<T> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => find_config_file(env_var, file_name)?,
    };
    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {:?}", config_path))
}

fn find_config_file(env_var: &str, file_name: &str) -> Result<PathBuf> {
    if let Ok(from_env) = std::env::var(env_var) {
        return Ok(PathBuf::from(from_env));
    }

    let candidates = [
        PathBuf::from(file_name),
        PathBuf::from("/etc/openvox-noop").join(file_name),
        dirs::config_dir()
            .map(|p| p.join("openvox-noop").join(file_name))
            .unwrap_or_default(),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }

    bail!(
        "No configuration file found; searched {:?} and ${}",
        candidates,
        env_var
    )
}

fn read_ssh_key(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(p) => {
            let key = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read SSH private key: {:?}", p))?;
            Ok(Some(key))
        }
        None => Ok(None),
    }
}
