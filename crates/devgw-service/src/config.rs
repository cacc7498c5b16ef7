//! Configuration management for the gateway server.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with DEVGW_ prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values
//!
//! String values in the file may reference the environment as `${VAR}` or
//! `$VAR`, and may start with `~` for the home directory. Unset variables
//! are left as written.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use devgw_adapter_pulse::{DEFAULT_SAMPLING_PERIOD_NS, VirtualZPolicy};
use devgw_hal::{BackendConfig, BackendKind, MitigationStrategy};

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener and request limits
    pub server: ServerConfig,

    /// Device topology, status and metadata
    pub device: DeviceConfig,

    /// Execution backend
    pub plugin: PluginConfig,

    /// Readout-error mitigation applied to results
    pub mitigation: MitigationStrategy,

    pub logging: LoggingConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "[::]:50051")
    #[serde(default = "default_address")]
    pub address: String,

    /// Runtime worker threads
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-request deadline in seconds; 0 disables it
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Largest accepted shot count
    #[serde(default = "default_max_shots")]
    pub max_shots: u32,

    /// Comma-separated allowed origins, or "*"
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

/// Device description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Topology JSON, rewritten after calibration
    #[serde(default = "default_topology_path")]
    pub topology_path: PathBuf,

    /// Plain-text status file (`active` / `inactive` / `maintenance`)
    #[serde(default = "default_status_path")]
    pub status_path: PathBuf,

    /// Reported device id; the topology's `device_id` when unset
    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default = "default_provider")]
    pub provider: String,

    /// Reported qubit count; the number of usable qubits when unset
    #[serde(default)]
    pub max_qubits: Option<usize>,
}

/// Backend selection and options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Backend kind: simulator (qulacs), pulse (qubex) or process (ybex)
    #[serde(default = "default_plugin")]
    pub name: String,

    #[serde(default)]
    pub seed: Option<u64>,

    /// Qubit labels programs may use; every topology qubit when unset
    #[serde(default)]
    pub exposed_qubits: Option<Vec<String>>,

    /// Backend-specific options, passed through verbatim
    #[serde(default)]
    pub backend: Map<String, Value>,

    #[serde(default)]
    pub pulse: PulseConfig,
}

/// Pulse backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_sampling_period")]
    pub sampling_period_ns: f64,

    #[serde(default)]
    pub virtual_z_policy: VirtualZPolicy,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: console, json
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions

fn default_address() -> String {
    "[::]:50051".to_string()
}

fn default_max_workers() -> usize {
    10
}

fn default_job_timeout() -> u64 {
    600 // 10 minutes
}

fn default_max_shots() -> u32 {
    100_000
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_topology_path() -> PathBuf {
    PathBuf::from("config/device_topology.json")
}

fn default_status_path() -> PathBuf {
    PathBuf::from("config/device_status")
}

fn default_provider() -> String {
    "devgw".to_string()
}

fn default_plugin() -> String {
    "simulator".to_string()
}

fn default_sampling_period() -> f64 {
    DEFAULT_SAMPLING_PERIOD_NS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: default_address(),
            max_workers: default_max_workers(),
            job_timeout_secs: default_job_timeout(),
            max_shots: default_max_shots(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            topology_path: default_topology_path(),
            status_path: default_status_path(),
            device_id: None,
            provider: default_provider(),
            max_qubits: None,
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        PluginConfig {
            name: default_plugin(),
            seed: None,
            exposed_qubits: None,
            backend: Map::new(),
            pulse: PulseConfig::default(),
        }
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        PulseConfig {
            sampling_period_ns: default_sampling_period(),
            virtual_z_policy: VirtualZPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl ServiceConfig {
    /// Load configuration from a YAML file, expanding environment references.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::IoError(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml(&contents, &env_lookup)
    }

    /// Parse YAML text, resolving `${VAR}`, `$VAR` and `~` through `lookup`.
    pub fn from_yaml(contents: &str, lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let mut tree: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        if tree.is_null() {
            return Ok(Self::default());
        }
        expand_tree(&mut tree, lookup);
        serde_yaml_ng::from_value(tree).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config.merge_env(&env_lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DEVGW_*` overrides.
    ///
    /// Only variables that are set override the file-loaded (or default)
    /// values.
    pub fn merge_env(mut self, lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("DEVGW_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = lookup("DEVGW_PLUGIN") {
            self.plugin.name = v;
        }
        if let Some(v) = lookup("DEVGW_TOPOLOGY_PATH") {
            self.device.topology_path = PathBuf::from(expand_value(&v, lookup));
        }
        if let Some(v) = lookup("DEVGW_STATUS_PATH") {
            self.device.status_path = PathBuf::from(expand_value(&v, lookup));
        }
        if let Some(v) = lookup("DEVGW_MITIGATION") {
            self.mitigation = v
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("DEVGW_MITIGATION: {e}")))?;
        }
        if let Some(v) = lookup("DEVGW_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("DEVGW_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_address()?;

        if self.server.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "max_workers must be greater than 0".to_string(),
            ));
        }
        if self.server.max_shots == 0 {
            return Err(ConfigError::ValidationError(
                "max_shots must be greater than 0".to_string(),
            ));
        }

        if self.device.topology_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError("topology_path must not be empty".to_string()));
        }
        if self.device.status_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError("status_path must not be empty".to_string()));
        }

        self.backend_kind()?;

        let period = self.plugin.pulse.sampling_period_ns;
        if !(period.is_finite() && period > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "sampling_period_ns must be positive, got {period}"
            )));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Get the parsed listen address.
    pub fn socket_address(&self) -> Result<SocketAddr, ConfigError> {
        self.server.address.parse().map_err(|_| {
            ConfigError::ValidationError(format!("Invalid server address: {}", self.server.address))
        })
    }

    /// The configured backend kind.
    pub fn backend_kind(&self) -> Result<BackendKind, ConfigError> {
        self.plugin
            .name
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("plugin.name: {e}")))
    }

    /// Per-request deadline, if any.
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.server.job_timeout_secs > 0).then(|| Duration::from_secs(self.server.job_timeout_secs))
    }

    /// Options handed to the backend factory.
    ///
    /// Starts from `plugin.backend` and adds `seed`, `exposed_qubits` and,
    /// for the pulse backend, the `plugin.pulse` settings.
    pub fn backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(self.plugin.name.clone());
        config.options = self.plugin.backend.clone();

        if let Some(seed) = self.plugin.seed {
            config.options.insert("seed".into(), seed.into());
        }
        if let Some(labels) = &self.plugin.exposed_qubits {
            config.options.insert("exposed_qubits".into(), labels.clone().into());
        }
        if matches!(self.backend_kind(), Ok(BackendKind::Pulse)) {
            let pulse = &self.plugin.pulse;
            config
                .options
                .insert("sampling_period_ns".into(), pulse.sampling_period_ns.into());
            config
                .options
                .insert("virtual_z_policy".into(), pulse.virtual_z_policy.to_string().into());
        }
        config
    }
}

fn expand_tree(value: &mut serde_yaml_ng::Value, lookup: Lookup<'_>) {
    use serde_yaml_ng::Value as Yaml;
    match value {
        Yaml::String(s) => *s = expand_value(s, lookup),
        Yaml::Sequence(items) => items.iter_mut().for_each(|item| expand_tree(item, lookup)),
        Yaml::Mapping(map) => map.values_mut().for_each(|item| expand_tree(item, lookup)),
        Yaml::Tagged(tagged) => expand_tree(&mut tagged.value, lookup),
        _ => {}
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expand `${VAR}`, `$VAR` and a leading `~` or `~/`.
fn expand_value(value: &str, lookup: Lookup<'_>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    if let Some(tail) = rest.strip_prefix('~') {
        if tail.is_empty() || tail.starts_with('/') {
            let home = lookup("HOME").or_else(|| dirs::home_dir().map(|p| p.to_string_lossy().into_owned()));
            if let Some(home) = home {
                out.push_str(&home);
                rest = tail;
            }
        }
    }

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                let name = &braced[..end];
                match lookup(name) {
                    Some(v) => out.push_str(&v),
                    None => out.push_str(&rest[pos..pos + end + 3]),
                }
                rest = &braced[end + 1..];
                continue;
            }
        } else {
            let len = after.find(|c| !is_name_char(c)).unwrap_or(after.len());
            if len > 0 {
                let name = &after[..len];
                match lookup(name) {
                    Some(v) => out.push_str(&v),
                    None => out.push_str(&rest[pos..pos + len + 1]),
                }
                rest = &after[len..];
                continue;
            }
        }

        out.push('$');
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
