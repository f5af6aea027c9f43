use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::topology::ClusterTopology;
use crate::peers::client::PeerClient;

/// After a successful probe, a peer stays "healthy" for this long even if
/// later probes fail. Tolerates transient flaps without a health daemon.
pub const HEALTH_GRACE: Duration = Duration::from_secs(60);

/// Live view of peer health, built from inline probes.
///
/// There is no background prober: callers that need the health view (the
/// placement planner, the replicator, the reconciler, the download
/// fallback) probe on demand, and the positive cache absorbs the flaps.
/// Observations are process-local; no cross-node gossip.
pub struct HealthTracker {
    peers: Arc<PeerClient>,
    last_healthy: DashMap<String, Instant>,
    grace: Duration,
}

impl HealthTracker {
    pub fn new(peers: Arc<PeerClient>) -> Self {
        Self {
            peers,
            last_healthy: DashMap::new(),
            grace: HEALTH_GRACE,
        }
    }

    /// Shrink the grace window, used by tests to expire observations.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Record a successful contact outside of probing (e.g. a peer just
    /// answered a transfer), extending its grace window.
    pub fn record_healthy(&self, node_url: &str) {
        self.last_healthy
            .insert(node_url.to_string(), Instant::now());
    }

    /// Probes the node now; on failure, falls back to the positive cache.
    pub async fn is_healthy(&self, node_url: &str) -> bool {
        if self.peers.probe(node_url).await {
            self.record_healthy(node_url);
            return true;
        }

        self.last_healthy
            .get(node_url)
            .is_some_and(|seen| seen.elapsed() < self.grace)
    }

    /// The configured peers that currently pass `is_healthy`, in
    /// configuration order.
    pub async fn healthy_peers(&self, topology: &ClusterTopology) -> Vec<String> {
        let mut healthy = Vec::new();
        for peer in &topology.peers {
            if self.is_healthy(peer).await {
                healthy.push(peer.clone());
            }
        }
        healthy
    }
}
