use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::chunks::store::ChunkStore;
use crate::cluster::health::HealthTracker;
use crate::cluster::topology::ClusterTopology;
use crate::metadata::MetadataStore;
use crate::peers::client::PeerClient;

pub const SYNC_STARTUP_DELAY: Duration = Duration::from_secs(10);
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Cap on concurrent per-file repairs within one pass.
pub const MAX_CONCURRENT_REPAIRS: usize = 50;

/// Bookkeeping from the most recent pass, surfaced by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub pass_id: String,
    pub files_seen: usize,
    pub repaired: usize,
    pub pruned: usize,
    pub failed: usize,
    pub finished_unix: u64,
}

enum RepairOutcome {
    Repaired,
    Pruned,
    Skipped,
    Failed,
}

/// Background anti-entropy: gathers inventories from every node, then
/// repairs under-replication (pull from the first scanned holder, push to
/// healthy non-holders) and prunes over-replication (lexicographic sort,
/// drop the suffix) with bounded parallelism.
///
/// Per-file failures never abort a pass; state left behind is retried on
/// the next pass. Inventory failures degrade to "node holds nothing",
/// which at worst triggers repairs that the HEAD-check makes idempotent.
pub struct Reconciler {
    topology: Arc<ClusterTopology>,
    health: Arc<HealthTracker>,
    peers: Arc<PeerClient>,
    store: Arc<ChunkStore>,
    metadata: Arc<dyn MetadataStore>,
    repair_slots: Arc<Semaphore>,
    last_summary: Mutex<Option<PassSummary>>,
}

impl Reconciler {
    pub fn new(
        topology: Arc<ClusterTopology>,
        health: Arc<HealthTracker>,
        peers: Arc<PeerClient>,
        store: Arc<ChunkStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            topology,
            health,
            peers,
            store,
            metadata,
            repair_slots: Arc::new(Semaphore::new(MAX_CONCURRENT_REPAIRS)),
            last_summary: Mutex::new(None),
        }
    }

    pub fn last_summary(&self) -> Option<PassSummary> {
        self.last_summary.lock().expect("summary lock poisoned").clone()
    }

    /// Starts the periodic loop: one pass after a short startup delay,
    /// then every `SYNC_INTERVAL`. A pass can also be triggered on demand
    /// via `run_pass`.
    pub fn spawn_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            tokio::time::sleep(SYNC_STARTUP_DELAY).await;
            loop {
                self.clone().run_pass().await;
                tokio::time::sleep(SYNC_INTERVAL).await;
            }
        });
    }

    /// One full reconciliation pass.
    pub async fn run_pass(self: Arc<Self>) {
        let pass_id = Uuid::new_v4().to_string();
        tracing::info!("[sync {}] starting synchronization pass", pass_id);

        let inventory = self.gather_inventory().await;
        let files_seen = inventory.len();

        // One health sweep per pass; every repair shares the same view.
        let healthy_peers = self.health.healthy_peers(&self.topology).await;
        let replication_factor = self.topology.replication_factor;

        let mut handles = Vec::new();
        for ((user_id, filename), holders) in inventory {
            if holders.len() == replication_factor {
                continue;
            }

            let reconciler = self.clone();
            let healthy = healthy_peers.clone();
            let pass = pass_id.clone();
            handles.push(tokio::spawn(async move {
                let Ok(_permit) = reconciler.repair_slots.clone().acquire_owned().await else {
                    return RepairOutcome::Failed;
                };

                if holders.len() < replication_factor {
                    reconciler
                        .repair_under(&pass, &user_id, &filename, holders, &healthy)
                        .await
                } else {
                    reconciler.prune_over(&pass, &user_id, &filename, holders).await
                }
            }));
        }

        let (mut repaired, mut pruned, mut failed) = (0, 0, 0);
        for handle in handles {
            match handle.await {
                Ok(RepairOutcome::Repaired) => repaired += 1,
                Ok(RepairOutcome::Pruned) => pruned += 1,
                Ok(RepairOutcome::Skipped) => {}
                Ok(RepairOutcome::Failed) => failed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!("[sync {}] repair task panicked: {}", pass_id, e);
                }
            }
        }

        tracing::info!(
            "[sync {}] pass complete: {} files, {} repaired, {} pruned, {} failed",
            pass_id,
            files_seen,
            repaired,
            pruned,
            failed
        );

        let summary = PassSummary {
            pass_id,
            files_seen,
            repaired,
            pruned,
            failed,
            finished_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        *self.last_summary.lock().expect("summary lock poisoned") = Some(summary);
    }

    /// Scans self plus every configured peer. The self scan comes first,
    /// so when the accepting node lists a file its copy is `holders[0]`
    /// and becomes the repair source.
    async fn gather_inventory(&self) -> HashMap<(String, String), Vec<String>> {
        let self_url = self.topology.self_url();
        let mut scans = Vec::new();

        for node in self.topology.all_nodes() {
            let files = if node == self_url {
                match self.store.enumerate_local().await {
                    Ok(files) => files,
                    Err(e) => {
                        tracing::warn!("[sync] failed to enumerate local files: {}", e);
                        Vec::new()
                    }
                }
            } else {
                self.peers
                    .inventory(&node)
                    .await
                    .into_iter()
                    .map(|entry| (entry.user_id, entry.name))
                    .collect()
            };
            scans.push((node, files));
        }

        merge_inventory(scans)
    }

    async fn repair_under(
        &self,
        pass_id: &str,
        user_id: &str,
        filename: &str,
        mut holders: Vec<String>,
        healthy_peers: &[String],
    ) -> RepairOutcome {
        let replication_factor = self.topology.replication_factor;
        let self_url = self.topology.self_url();

        tracing::info!(
            "[sync {}] file {} (user {}) under-replicated ({}/{}), replicating...",
            pass_id,
            filename,
            user_id,
            holders.len(),
            replication_factor
        );

        let targets = repair_targets(&holders, healthy_peers, &self_url, replication_factor);
        if targets.is_empty() {
            // Nothing reachable to repair onto; leave it for a later pass.
            return RepairOutcome::Skipped;
        }

        let source = holders[0].clone();
        let data = match self.fetch_from(&source, user_id, filename).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    "[sync {}] failed to download {} from {}: {}",
                    pass_id,
                    filename,
                    source,
                    e
                );
                return RepairOutcome::Failed;
            }
        };

        let mut progressed = false;
        for target in targets {
            let result = if target == self_url {
                self.store
                    .write(user_id, filename, &data)
                    .await
                    .map(|_| ())
                    .map_err(anyhow::Error::from)
            } else {
                self.peers
                    .push(&target, user_id, filename, data.clone(), true)
                    .await
            };

            match result {
                Ok(()) => {
                    holders.push(target);
                    progressed = true;
                }
                Err(e) => {
                    tracing::warn!(
                        "[sync {}] failed to replicate {} to {}: {}",
                        pass_id,
                        filename,
                        target,
                        e
                    );
                }
            }
        }

        tracing::info!(
            "[sync {}] replication of {} (user {}) done, now {} replicas",
            pass_id,
            filename,
            user_id,
            holders.len()
        );

        if progressed {
            RepairOutcome::Repaired
        } else {
            RepairOutcome::Failed
        }
    }

    async fn prune_over(
        &self,
        pass_id: &str,
        user_id: &str,
        filename: &str,
        holders: Vec<String>,
    ) -> RepairOutcome {
        let replication_factor = self.topology.replication_factor;
        let self_url = self.topology.self_url();

        // Never delete a file the directory does not know about; orphan
        // chunks wait for operator cleanup.
        match self.metadata.lookup(user_id, filename).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::info!(
                    "[sync {}] keeping {} (user {}): unknown to metadata",
                    pass_id,
                    filename,
                    user_id
                );
                return RepairOutcome::Skipped;
            }
            Err(e) => {
                tracing::warn!("[sync {}] metadata lookup failed: {}", pass_id, e);
                return RepairOutcome::Failed;
            }
        }

        tracing::info!(
            "[sync {}] file {} (user {}) over-replicated ({}/{}), removing extra replicas...",
            pass_id,
            filename,
            user_id,
            holders.len(),
            replication_factor
        );

        let mut any_failed = false;
        for node in surplus_replicas(&holders, replication_factor) {
            let result = if node == self_url {
                self.store
                    .delete(user_id, filename)
                    .await
                    .map_err(anyhow::Error::from)
            } else {
                self.peers.remove(&node, user_id, filename).await
            };

            match result {
                Ok(()) => tracing::info!(
                    "[sync {}] deleted {} (user {}) from {} (over-replicated)",
                    pass_id,
                    filename,
                    user_id,
                    node
                ),
                Err(e) => {
                    any_failed = true;
                    tracing::warn!(
                        "[sync {}] failed to delete {} from {}: {}",
                        pass_id,
                        filename,
                        node,
                        e
                    );
                }
            }
        }

        if any_failed {
            RepairOutcome::Failed
        } else {
            RepairOutcome::Pruned
        }
    }

    async fn fetch_from(
        &self,
        source: &str,
        user_id: &str,
        filename: &str,
    ) -> anyhow::Result<Vec<u8>> {
        if source == self.topology.self_url() {
            Ok(self.store.read_all(user_id, filename).await?)
        } else {
            self.peers.raw_get(source, user_id, filename).await
        }
    }
}

/// Collapses per-node scans into `(user, filename) -> holders`, keeping
/// holders in scan order so the repair source is stable within a pass.
pub(crate) fn merge_inventory(
    scans: Vec<(String, Vec<(String, String)>)>,
) -> HashMap<(String, String), Vec<String>> {
    let mut merged: HashMap<(String, String), Vec<String>> = HashMap::new();
    for (node, files) in scans {
        for (user_id, filename) in files {
            let holders = merged.entry((user_id, filename)).or_default();
            if !holders.contains(&node) {
                holders.push(node.clone());
            }
        }
    }
    merged
}

/// The replicas to drop: everything past the replication factor after a
/// lexicographic sort. The sort makes pruning deterministic across passes
/// and across nodes.
pub(crate) fn surplus_replicas(holders: &[String], replication_factor: usize) -> Vec<String> {
    if holders.len() <= replication_factor {
        return Vec::new();
    }
    let mut sorted = holders.to_vec();
    sorted.sort();
    sorted.split_off(replication_factor)
}

/// Targets for an under-replicated file: healthy peers not already holding
/// it, capped at the missing count. Self is the fallback target only when
/// no healthy non-holder exists.
pub(crate) fn repair_targets(
    holders: &[String],
    healthy_peers: &[String],
    self_url: &str,
    replication_factor: usize,
) -> Vec<String> {
    let needed = replication_factor.saturating_sub(holders.len());
    if needed == 0 {
        return Vec::new();
    }

    let targets: Vec<String> = healthy_peers
        .iter()
        .filter(|peer| !holders.iter().any(|holder| holder == *peer))
        .take(needed)
        .cloned()
        .collect();

    if targets.is_empty() && !holders.iter().any(|holder| holder == self_url) {
        return vec![self_url.to_string()];
    }
    targets
}
