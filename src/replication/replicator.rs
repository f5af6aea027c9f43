use std::sync::Arc;
use std::time::Duration;

use crate::cluster::health::HealthTracker;
use crate::cluster::topology::ClusterTopology;
use crate::peers::client::PeerClient;

pub const REPLICATE_MAX_RETRIES: u32 = 3;
pub const REPLICATE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Synchronous replication fan-out, run by the node that accepted an
/// upload.
///
/// Walks healthy peers in configuration order and pushes until the
/// replication factor counts the local copy plus enough peers. A peer that
/// already holds the file (HEAD probe) is counted without a transfer, so
/// re-running the fan-out never duplicates work.
pub struct Replicator {
    topology: Arc<ClusterTopology>,
    health: Arc<HealthTracker>,
    peers: Arc<PeerClient>,
}

impl Replicator {
    pub fn new(
        topology: Arc<ClusterTopology>,
        health: Arc<HealthTracker>,
        peers: Arc<PeerClient>,
    ) -> Self {
        Self {
            topology,
            health,
            peers,
        }
    }

    /// Replicates an already-locally-stored payload. Returns the nodes
    /// that hold a copy, self first.
    ///
    /// Failing to reach the replication factor does not fail the upload;
    /// the reconciler is the backstop.
    pub async fn replicate(&self, user_id: &str, filename: &str, data: &[u8]) -> Vec<String> {
        let self_url = self.topology.self_url();
        let replication_factor = self.topology.replication_factor;

        let mut stored_on = vec![self_url.clone()];

        for peer in self.health.healthy_peers(&self.topology).await {
            if stored_on.len() >= replication_factor {
                break;
            }
            if peer == self_url {
                continue;
            }

            if self.peers.head(&peer, user_id, filename).await {
                stored_on.push(peer);
                continue;
            }

            if self.push_with_retry(&peer, user_id, filename, data).await {
                stored_on.push(peer);
            }
        }

        if stored_on.len() < replication_factor {
            tracing::warn!(
                "[replicate] file {} under-replicated ({}/{})",
                filename,
                stored_on.len(),
                replication_factor
            );
        }
        stored_on
    }

    async fn push_with_retry(
        &self,
        peer: &str,
        user_id: &str,
        filename: &str,
        data: &[u8],
    ) -> bool {
        for attempt in 1..=REPLICATE_MAX_RETRIES {
            tracing::info!(
                "[replicate] sending {} to {} (attempt {})",
                filename,
                peer,
                attempt
            );

            match self
                .peers
                .push(peer, user_id, filename, data.to_vec(), true)
                .await
            {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!("[replicate] {} failed attempt {}: {}", peer, attempt, e);
                    if attempt < REPLICATE_MAX_RETRIES {
                        tokio::time::sleep(REPLICATE_RETRY_DELAY * attempt).await;
                    }
                }
            }
        }

        tracing::warn!("[replicate] giving up on {} after retries", peer);
        false
    }
}
