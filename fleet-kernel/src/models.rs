use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reachability parameters and display data for one fleet member.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeDescriptor {
    pub id: String,
    pub display_name: String,
    pub endpoint: String,
    pub remote_target: Option<String>, // None => local machine
    pub metadata: NodeMetadata,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NodeMetadata {
    pub icon: String,
    pub gpu: String,
    pub role: String,
}

impl NodeDescriptor {
    pub fn is_local(&self) -> bool {
        self.remote_target.is_none()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
    pub family: String,
    pub param_size: String,
    pub quantization_level: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: u8,
}

/// Host-level facts. Every field is optional: a partial read is still a result.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SystemInfo {
    pub hostname: Option<String>,
    pub uptime: Option<String>,
    pub cpu_load: Option<f64>,
    pub cpus: Option<usize>,
    pub memory: Option<MemoryInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one probe against one node. Built once, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub node_id: String,
    pub name: Option<String>,
    #[serde(flatten)]
    pub metadata: NodeMetadata,
    pub status: InferenceStatus,
    pub models: Vec<ModelInfo>,
    pub system: Option<SystemInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: Option<u64>,
    pub probed_at: String,
}

impl HealthSnapshot {
    pub fn is_online(&self) -> bool {
        self.status == InferenceStatus::Online
    }
}

/// One snapshot per registered node, keyed by node id.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct FleetSnapshot(BTreeMap<String, HealthSnapshot>);

impl FleetSnapshot {
    pub fn get(&self, node_id: &str) -> Option<&HealthSnapshot> {
        self.0.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HealthSnapshot)> {
        self.0.iter()
    }

    pub fn online_count(&self) -> usize {
        self.0.values().filter(|s| s.is_online()).count()
    }

    pub fn summary(&self) -> FleetSummary {
        let online = self.online_count();
        let total = self.len();
        FleetSummary {
            online,
            total,
            label: format!("{online}/{total} nodes online"),
            models: self.0.values().map(|s| s.models.len()).sum(),
        }
    }
}

impl FromIterator<HealthSnapshot> for FleetSnapshot {
    fn from_iter<I: IntoIterator<Item = HealthSnapshot>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| (s.node_id.clone(), s)).collect())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FleetSummary {
    pub online: usize,
    pub total: usize,
    pub label: String,
    pub models: usize,
}

/// One chat turn, relayed as received. Fields other than `role`/`content`
/// (`images`, `tool_calls`, ...) ride along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InferenceResult {
    pub response: String,
    pub model: String,
    pub node_id: String,
    pub latency_ms: u64,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
    pub tokens_per_second: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PullOutcome {
    pub status: PullStatus,
    pub detail: String,
}
