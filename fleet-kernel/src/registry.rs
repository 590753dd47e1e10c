//! Static node registry.
//!
//! Built once from [`FleetConfig`] at startup and shared read-only behind an
//! `Arc`. It is the only place endpoints and shell targets come from.

use std::collections::BTreeMap;

use crate::config::{FleetConfig, NodeConf};
use crate::error::{FleetError, FleetResult};
use crate::models::{NodeDescriptor, NodeMetadata};

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, NodeDescriptor>,
}

impl NodeRegistry {
    pub fn from_config(cfg: &FleetConfig) -> FleetResult<Self> {
        if cfg.nodes.is_empty() {
            return Err(FleetError::Config("no nodes configured".into()));
        }
        let nodes = cfg
            .nodes
            .iter()
            .map(|(id, conf)| descriptor(id, conf).map(|d| (id.clone(), d)))
            .collect::<FleetResult<BTreeMap<_, _>>>()?;
        Ok(Self { nodes })
    }

    pub fn resolve(&self, node_id: &str) -> FleetResult<&NodeDescriptor> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| FleetError::UnknownNode(node_id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn descriptor(id: &str, conf: &NodeConf) -> FleetResult<NodeDescriptor> {
    let endpoint = validate_endpoint(id, &conf.endpoint)?;
    let remote_target = match conf.remote.as_deref().map(str::trim) {
        Some("") => {
            return Err(FleetError::Config(format!("node {id}: empty remote target")));
        }
        Some(target) => Some(target.to_string()),
        None => None,
    };
    Ok(NodeDescriptor {
        id: id.to_string(),
        display_name: conf.name.clone().unwrap_or_else(|| id.to_string()),
        endpoint,
        remote_target,
        metadata: NodeMetadata {
            icon: conf.icon.clone(),
            gpu: conf.gpu.clone(),
            role: conf.role.clone(),
        },
    })
}

fn validate_endpoint(id: &str, raw: &str) -> FleetResult<String> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| FleetError::Config(format!("node {id}: bad endpoint {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(FleetError::Config(format!(
            "node {id}: endpoint must be an http(s) URL, got {raw:?}"
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
