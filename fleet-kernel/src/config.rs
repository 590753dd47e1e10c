use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, time::Duration};
use tokio::fs;
use tracing::warn;

use crate::error::{FleetError, FleetResult};

pub const DEFAULT_CONFIG_PATH: &str = "fleet.yaml";
pub const DEFAULT_SHELL_COMMAND: &str =
    "ssh -o ConnectTimeout=5 -o StrictHostKeyChecking=no -o BatchMode=yes";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FleetConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeConf>,
    #[serde(default)]
    pub timeouts: TimeoutsConf,
    #[serde(default)]
    pub shell: ShellConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NodeConf {
    pub name: Option<String>,
    pub endpoint: String,
    pub remote: Option<String>, // ex: "root@203.0.113.22", absent => local
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub gpu: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutsConf {
    pub probe_ms: u64,
    pub shell_ms: u64,
    pub generate_ms: u64,
    pub pull_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ShellConf {
    pub command: String,
    pub max_output_bytes: usize,
}

impl Default for TimeoutsConf {
    fn default() -> Self {
        Self {
            probe_ms: 5_000,
            shell_ms: 8_000,
            generate_ms: 300_000,
            pull_ms: 600_000,
        }
    }
}

impl TimeoutsConf {
    pub fn probe(&self) -> Duration { Duration::from_millis(self.probe_ms) }
    pub fn shell(&self) -> Duration { Duration::from_millis(self.shell_ms) }
    pub fn generate(&self) -> Duration { Duration::from_millis(self.generate_ms) }
    pub fn pull(&self) -> Duration { Duration::from_millis(self.pull_ms) }
}

impl Default for ShellConf {
    fn default() -> Self {
        Self {
            command: DEFAULT_SHELL_COMMAND.into(),
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl ShellConf {
    /// Splits `command` into program + leading arguments.
    pub fn argv(&self) -> FleetResult<Vec<String>> {
        let argv = shell_words::split(&self.command)
            .map_err(|e| FleetError::Config(format!("shell.command: {e}")))?;
        if argv.is_empty() {
            return Err(FleetError::Config("shell.command is empty".into()));
        }
        Ok(argv)
    }
}

fn default_listen() -> String {
    "0.0.0.0:3847".into()
}

impl Default for FleetConfig {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "local".to_string(),
            NodeConf {
                name: Some("Local machine".into()),
                endpoint: "http://127.0.0.1:11434".into(),
                remote: None,
                icon: "💻".into(),
                gpu: String::new(),
                role: "Primary".into(),
            },
        );
        Self {
            listen: default_listen(),
            nodes,
            timeouts: TimeoutsConf::default(),
            shell: ShellConf::default(),
        }
    }
}

impl FleetConfig {
    pub fn from_yaml_str(txt: &str) -> FleetResult<Self> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(txt).map_err(|e| FleetError::Config(e.to_string()))
    }
}

/// Reads `$FLEET_KERNEL_CONFIG` (or `fleet.yaml`); falls back to the default topology.
pub async fn load_config() -> FleetConfig {
    let path = std::env::var("FLEET_KERNEL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut cfg = load_config_from(&path).await;
    if let Ok(listen) = std::env::var("FLEET_KERNEL_LISTEN") {
        cfg.listen = listen;
    }
    cfg
}

pub async fn load_config_from(path: impl AsRef<Path>) -> FleetConfig {
    let path = path.as_ref();
    if !path.exists() {
        warn!("no config at {}, using default topology", path.display());
        return FleetConfig::default();
    }
    let txt = match fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) => {
            warn!("unreadable config {}: {e}, using default topology", path.display());
            return FleetConfig::default();
        }
    };
    FleetConfig::from_yaml_str(&txt).unwrap_or_else(|e| {
        warn!("invalid config {}: {e}", path.display());
        FleetConfig::default()
    })
}
