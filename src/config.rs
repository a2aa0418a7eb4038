use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BootgateConfig {
    pub dependency: DependencyConfig,

    /// Ordered preparation steps run after the readiness gate opens
    #[serde(default)]
    pub prepare: Vec<PrepareStep>,

    pub server: ServerConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DependencyConfig {
    /// Hostname of the dependency to gate on
    #[serde(default = "default_dependency_host")]
    pub host: String,

    /// TCP port of the dependency
    #[serde(default = "default_dependency_port")]
    pub port: u16,

    /// Seconds between connection attempts
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-attempt connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum connection attempts before giving up (unset = poll forever)
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrepareStep {
    /// Step name used in logs and error reporting
    pub name: String,

    /// Command argv, program first
    pub command: Vec<String>,

    #[serde(default)]
    pub on_failure: FailurePolicy,
}

/// What to do when a preparation step exits non-zero
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort startup, propagating the step's exit code
    #[default]
    Abort,
    /// Log the failure and keep going
    Continue,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server command argv, program first
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default)]
    pub mode: LaunchMode,

    /// Extra args appended in development mode
    #[serde(default = "default_dev_args")]
    pub dev_args: Vec<String>,

    /// Extra args appended in production mode
    #[serde(default = "default_prod_args")]
    pub prod_args: Vec<String>,

    /// Environment variables passed to the server process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    Development,
    #[default]
    Production,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShutdownConfig {
    /// Seconds to wait after forwarding SIGTERM before escalating to SIGKILL
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

impl ServerConfig {
    /// Full argv with the mode-specific flags appended. The two flag sets
    /// are mutually exclusive by construction.
    pub fn effective_command(&self) -> Vec<String> {
        let mut argv = self.command.clone();
        match self.mode {
            LaunchMode::Development => argv.extend(self.dev_args.iter().cloned()),
            LaunchMode::Production => argv.extend(self.prod_args.iter().cloned()),
        }
        argv
    }
}

impl BootgateConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("bootgate.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("dependency.host", default_dependency_host())?
            .set_default("dependency.port", default_dependency_port() as i64)?
            .set_default("dependency.poll_interval_secs", default_poll_interval())?
            .set_default("dependency.connect_timeout_secs", default_connect_timeout())?
            .set_default("server.command", Vec::<String>::new())?
            .set_default("server.mode", "production")?
            .set_default("server.dev_args", default_dev_args())?
            .set_default("server.prod_args", default_prod_args())?
            .set_default("shutdown.grace_period_secs", default_grace_period() as i64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with BOOTGATE_ prefix. The separator
            // splits on every underscore, so only single-segment keys are
            // reachable this way (e.g. BOOTGATE_DEPENDENCY_HOST,
            // BOOTGATE_DEPENDENCY_PORT, BOOTGATE_SERVER_MODE); multi-word
            // keys like poll_interval_secs are file-only
            .add_source(Environment::with_prefix("BOOTGATE").separator("_"))
            .build()?;

        let config: BootgateConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dependency.port == 0 {
            return Err(ConfigError::Message(
                "Dependency port must be greater than 0".to_string(),
            ));
        }

        if self.dependency.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Dependency poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(0) = self.dependency.max_attempts {
            return Err(ConfigError::Message(
                "Dependency max_attempts must be greater than 0 when set".to_string(),
            ));
        }

        if self.server.command.is_empty() {
            return Err(ConfigError::Message(
                "Server command must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for step in &self.prepare {
            if step.name.is_empty() {
                return Err(ConfigError::Message(
                    "Preparation step name must not be empty".to_string(),
                ));
            }
            if step.command.is_empty() {
                return Err(ConfigError::Message(format!(
                    "Preparation step '{}' has an empty command",
                    step.name
                )));
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ConfigError::Message(format!(
                    "Duplicate preparation step name: '{}'",
                    step.name
                )));
            }
        }

        Ok(())
    }
}

impl Default for BootgateConfig {
    fn default() -> Self {
        Self {
            dependency: DependencyConfig {
                host: default_dependency_host(),
                port: default_dependency_port(),
                poll_interval_secs: default_poll_interval(),
                connect_timeout_secs: default_connect_timeout(),
                max_attempts: None,
            },
            prepare: Vec::new(),
            server: ServerConfig {
                command: Vec::new(),
                mode: LaunchMode::Production,
                dev_args: default_dev_args(),
                prod_args: default_prod_args(),
                env: HashMap::new(),
            },
            shutdown: ShutdownConfig {
                grace_period_secs: default_grace_period(),
            },
        }
    }
}

// Default value functions
fn default_dependency_host() -> String {
    "db".to_string()
}
fn default_dependency_port() -> u16 {
    5432
}
fn default_poll_interval() -> u64 {
    1
}
fn default_connect_timeout() -> u64 {
    5
}

fn default_dev_args() -> Vec<String> {
    vec![
        "--reload".to_string(),
        "--workers".to_string(),
        "1".to_string(),
    ]
}
fn default_prod_args() -> Vec<String> {
    vec![
        "--workers".to_string(),
        "4".to_string(),
        "--timeout".to_string(),
        "120".to_string(),
    ]
}

fn default_grace_period() -> u64 {
    30
}
