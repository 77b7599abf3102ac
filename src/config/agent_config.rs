use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AGENT_VERSION, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_CRASH_DIR,
    DEFAULT_IDENTITY_CACHE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SUBMIT_URL, MAX_FIELD_SIZE,
    PROC_NET_IPV6_ROUTE, PROC_NET_ROUTE, PRODUCT_UUID_PATH, REACHABILITY_POLL_INTERVAL_SECS, REPORT_SUFFIX,
    SYS_CLASS_NET, VENDOR_SERIAL_PATH,
};
use crate::report::policy::{DEFAULT_ACCEPTED_FIELDS, DEFAULT_REJECTED_FIELDS};

/// Top-level agent configuration, read once at start-up.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Base URL of the crash intake service
    pub submit_url: String,
    /// Directory scanned for crash reports
    pub crash_dir: PathBuf,
    /// File name suffix of crash reports
    pub report_suffix: String,
    /// Delete reports after a successful upload
    pub cleanup: bool,
    /// Value of the agent version header
    pub agent_version: String,
    pub http: HttpConfig,
    pub identity: IdentityConfig,
    pub policy: PolicyConfig,
    pub parser: ParserConfig,
    pub reachability: ReachabilityConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IdentityConfig {
    /// File holding the cached, hashed identity
    pub cache_path: PathBuf,
    /// Raw identity sources, tried in this order
    pub sources: Vec<IdentitySource>,
}

/// A raw identity source
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentitySource {
    /// Hardware address of the first Ethernet interface under `net_class_dir`
    MacAddress { net_class_dir: PathBuf },
    /// Contents of a single file
    File { path: PathBuf },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Fields uploaded regardless of size
    pub accepted_fields: Vec<String>,
    /// Fields never uploaded
    pub rejected_fields: Vec<String>,
    /// Size cap in bytes for any other field
    pub max_field_size: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ParserConfig {
    /// Abort parsing on the first malformed line instead of skipping it
    pub strict: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReachabilityMode {
    /// Follow the kernel routing table
    RouteTable,
    /// Assume the destination is always reachable over an unmetered route
    Always,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReachabilityConfig {
    pub mode: ReachabilityMode,
    pub poll_interval_secs: u64,
    pub route_table: PathBuf,
    pub ipv6_route_table: PathBuf,
    pub net_class_dir: PathBuf,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            submit_url: DEFAULT_SUBMIT_URL.to_string(),
            crash_dir: PathBuf::from(DEFAULT_CRASH_DIR),
            report_suffix: REPORT_SUFFIX.to_string(),
            cleanup: false,
            agent_version: DEFAULT_AGENT_VERSION.to_string(),
            http: HttpConfig::default(),
            identity: IdentityConfig::default(),
            policy: PolicyConfig::default(),
            parser: ParserConfig::default(),
            reachability: ReachabilityConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            connect_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig {
            cache_path: PathBuf::from(DEFAULT_IDENTITY_CACHE),
            sources: vec![
                IdentitySource::MacAddress { net_class_dir: PathBuf::from(SYS_CLASS_NET) },
                IdentitySource::File { path: PathBuf::from(PRODUCT_UUID_PATH) },
                IdentitySource::File { path: PathBuf::from(VENDOR_SERIAL_PATH) },
            ],
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            accepted_fields: DEFAULT_ACCEPTED_FIELDS.iter().map(|s| s.to_string()).collect(),
            rejected_fields: DEFAULT_REJECTED_FIELDS.iter().map(|s| s.to_string()).collect(),
            max_field_size: MAX_FIELD_SIZE,
        }
    }
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        ReachabilityConfig {
            mode: ReachabilityMode::RouteTable,
            poll_interval_secs: REACHABILITY_POLL_INTERVAL_SECS,
            route_table: PathBuf::from(PROC_NET_ROUTE),
            ipv6_route_table: PathBuf::from(PROC_NET_IPV6_ROUTE),
            net_class_dir: PathBuf::from(SYS_CLASS_NET),
        }
    }
}

impl ReachabilityConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl AgentConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: AgentConfig = serde_yaml::from_str(content)
            .context("Failed to parse YAML config")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Reject settings the agent cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.submit_url.trim().is_empty() {
            bail!("submit_url must not be empty");
        }
        if self.report_suffix.is_empty() {
            bail!("report_suffix must not be empty");
        }
        if self.identity.sources.is_empty() {
            bail!("at least one identity source is required");
        }
        if self.policy.max_field_size == 0 {
            bail!("policy.max_field_size must be positive");
        }

        for field in &self.policy.accepted_fields {
            if self.policy.rejected_fields.contains(field) {
                warn!("Field {} is both accepted and rejected; it will be rejected", field);
            }
        }

        Ok(())
    }
}

/// Load the configuration from `path`, or fall back to the built-in defaults
pub fn load_or_create_config(path: Option<&Path>) -> Result<AgentConfig> {
    match path {
        Some(path) => AgentConfig::from_yaml_file(path),
        None => {
            debug!("No configuration file given, using defaults");
            Ok(AgentConfig::default())
        }
    }
}
