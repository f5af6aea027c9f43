use std::sync::Arc;

use super::health::HealthTracker;
use super::topology::ClusterTopology;
use crate::chunks::store::ChunkStore;
use crate::peers::client::PeerClient;

/// Chooses the node that should accept a new upload: the candidate with
/// the fewest stored files for the uploading user.
///
/// Self is always a candidate (first in iteration order, so it wins ties);
/// peers join the candidate set only while healthy. This is a greedy
/// per-file balance and deliberately ignores byte volume.
pub struct PlacementPlanner {
    topology: Arc<ClusterTopology>,
    health: Arc<HealthTracker>,
    peers: Arc<PeerClient>,
    store: Arc<ChunkStore>,
}

impl PlacementPlanner {
    pub fn new(
        topology: Arc<ClusterTopology>,
        health: Arc<HealthTracker>,
        peers: Arc<PeerClient>,
        store: Arc<ChunkStore>,
    ) -> Self {
        Self {
            topology,
            health,
            peers,
            store,
        }
    }

    /// Target node (base URL) for a new upload by `user_id`.
    pub async fn choose_target(&self, user_id: &str) -> String {
        let self_url = self.topology.self_url();

        let mut candidates = vec![self_url.clone()];
        candidates.extend(self.health.healthy_peers(&self.topology).await);

        let mut counted = Vec::with_capacity(candidates.len());
        for node in candidates {
            let count = self.file_count(&node, user_id).await;
            counted.push((node, count));
        }

        let target = least_loaded(&counted).unwrap_or(self_url);
        if let Some((_, count)) = counted.iter().find(|(node, _)| *node == target) {
            tracing::info!(
                "[load-balance] selected node {} with {} files for user {}",
                target,
                count,
                user_id
            );
        }
        target
    }

    async fn file_count(&self, node_url: &str, user_id: &str) -> usize {
        if node_url == self.topology.self_url() {
            return self.store.user_file_count(user_id).await;
        }

        self.peers
            .inventory(node_url)
            .await
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .count()
    }
}

/// The candidate with the strictly smallest count; ties go to the first
/// candidate in iteration order.
pub(crate) fn least_loaded(counts: &[(String, usize)]) -> Option<String> {
    let mut best: Option<&(String, usize)> = None;
    for candidate in counts {
        match best {
            Some((_, best_count)) if candidate.1 >= *best_count => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|(node, _)| node.clone())
}
