/*!
 * HEALTH PROBER - One health check against one node
 *
 * ROLE: liveness + model inventory from the inference endpoint, and host
 * system info from the local OS or the remote shell.
 *
 * CONTRACT: `probe()` never fails. Every failure lands in the snapshot
 * (`status`/`error` for inference, `system.error` for system info), so the
 * dashboard always has something to render for every node.
 *
 * The inference branch and the system branch run concurrently and neither
 * can affect the other's fields.
 */

use std::sync::Arc;
use std::time::{Duration, Instant};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, warn};

use crate::config::TimeoutsConf;
use crate::error::{FleetError, FleetResult};
use crate::models::{HealthSnapshot, InferenceStatus, ModelInfo, NodeDescriptor, NodeMetadata, SystemInfo};
use crate::registry::NodeRegistry;
use crate::system::SystemInfoSource;
use crate::transport::{HttpTransport, RemoteShell};
use crate::wire::{TagsResponse, PATH_LIVENESS, PATH_TAGS};

#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    /// Bound for each endpoint call (liveness, inventory).
    pub http_timeout: Duration,
    /// Bound for the remote system-info command.
    pub shell_timeout: Duration,
}

impl From<&TimeoutsConf> for ProbeSettings {
    fn from(t: &TimeoutsConf) -> Self {
        Self {
            http_timeout: t.probe(),
            shell_timeout: t.shell(),
        }
    }
}

#[derive(Clone)]
pub struct HealthProber {
    registry: Arc<NodeRegistry>,
    http: HttpTransport,
    shell: Arc<dyn RemoteShell>,
    settings: ProbeSettings,
}

/// Outcome of the inference branch of a probe.
struct InferenceProbe {
    status: InferenceStatus,
    models: Vec<ModelInfo>,
    error: Option<String>,
    latency_ms: Option<u64>,
}

impl InferenceProbe {
    fn offline(error: String) -> Self {
        Self {
            status: InferenceStatus::Offline,
            models: Vec::new(),
            error: Some(error),
            latency_ms: None,
        }
    }
}

impl HealthProber {
    pub fn new(
        registry: Arc<NodeRegistry>,
        http: HttpTransport,
        shell: Arc<dyn RemoteShell>,
        settings: ProbeSettings,
    ) -> Self {
        Self { registry, http, shell, settings }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub async fn probe(&self, node_id: &str) -> HealthSnapshot {
        let probed_at = now_rfc3339();
        let node = match self.registry.resolve(node_id) {
            Ok(node) => node,
            Err(e) => {
                return HealthSnapshot {
                    node_id: node_id.to_string(),
                    name: None,
                    metadata: NodeMetadata::default(),
                    status: InferenceStatus::Offline,
                    models: Vec::new(),
                    system: None,
                    error: Some(e.to_string()),
                    latency_ms: None,
                    probed_at,
                };
            }
        };

        let (inference, system) = tokio::join!(self.probe_inference(node), self.probe_system(node));

        debug!(
            "probe {} -> {:?}, {} models",
            node.id,
            inference.status,
            inference.models.len()
        );

        HealthSnapshot {
            node_id: node.id.clone(),
            name: Some(node.display_name.clone()),
            metadata: node.metadata.clone(),
            status: inference.status,
            models: inference.models,
            system: Some(system),
            error: inference.error,
            latency_ms: inference.latency_ms,
            probed_at,
        }
    }

    async fn probe_inference(&self, node: &NodeDescriptor) -> InferenceProbe {
        let timeout = self.settings.http_timeout;
        let started = Instant::now();

        match self.http.get(&node.url(PATH_LIVENESS), timeout).await {
            Ok(resp) if resp.status == 200 => {}
            Ok(resp) => {
                return InferenceProbe::offline(format!("liveness check returned HTTP {}", resp.status));
            }
            Err(e) => {
                warn!("node {} offline: {e}", node.id);
                return InferenceProbe::offline(e.to_string());
            }
        }
        let latency_ms = Some(started.elapsed().as_millis() as u64);

        // Online from here on: an inventory failure only costs us the model list.
        let (models, error) = match self.http.get(&node.url(PATH_TAGS), timeout).await {
            Ok(resp) if resp.status == 200 => match parse_inventory(&resp.body) {
                Ok(models) => (models, None),
                Err(e) => (Vec::new(), Some(format!("model inventory unreadable: {e}"))),
            },
            Ok(resp) => (Vec::new(), Some(format!("model inventory returned HTTP {}", resp.status))),
            Err(e) => (Vec::new(), Some(format!("model inventory unavailable: {e}"))),
        };
        if let Some(e) = &error {
            warn!("node {}: {e}", node.id);
        }

        InferenceProbe {
            status: InferenceStatus::Online,
            models,
            error,
            latency_ms,
        }
    }

    async fn probe_system(&self, node: &NodeDescriptor) -> SystemInfo {
        let source = SystemInfoSource::for_node(node);
        match source.collect(self.shell.as_ref(), self.settings.shell_timeout).await {
            Ok(info) => info,
            Err(e) => {
                warn!("node {}: system info unavailable: {e}", node.id);
                SystemInfo {
                    error: Some(e.to_string()),
                    ..SystemInfo::default()
                }
            }
        }
    }
}

/// Ordered model list from a `/api/tags` body.
pub fn parse_inventory(body: &str) -> FleetResult<Vec<ModelInfo>> {
    let tags: TagsResponse = serde_json::from_str(body).map_err(|e| FleetError::Parse(e.to_string()))?;
    Ok(tags.models.into_iter().map(ModelInfo::from).collect())
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
