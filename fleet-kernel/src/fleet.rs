//! Fleet aggregation: one concurrent probe per registered node, merged into a
//! single snapshot keyed by node id.

use futures::future::join_all;
use std::time::Instant;
use tracing::info;

use crate::health::HealthProber;
use crate::models::{FleetSnapshot, HealthSnapshot};

#[derive(Clone)]
pub struct FleetAggregator {
    prober: HealthProber,
}

impl FleetAggregator {
    pub fn new(prober: HealthProber) -> Self {
        Self { prober }
    }

    pub fn prober(&self) -> &HealthProber {
        &self.prober
    }

    /// Completes in roughly the slowest node's bounded probe time; a slow or dead
    /// node never delays or hides another node's result.
    pub async fn probe_all(&self) -> FleetSnapshot {
        let started = Instant::now();
        let probes = self.prober.registry().ids().map(|id| self.prober.probe(id));
        let snapshots: Vec<HealthSnapshot> = join_all(probes).await;
        let fleet: FleetSnapshot = snapshots.into_iter().collect();

        let summary = fleet.summary();
        info!(
            "fleet probe: {} ({} models) in {}ms",
            summary.label,
            summary.models,
            started.elapsed().as_millis()
        );
        fleet
    }

    pub async fn probe(&self, node_id: &str) -> HealthSnapshot {
        self.prober.probe(node_id).await
    }
}
