use std::path::PathBuf;

/// Default replica count: each file should live on this many nodes.
pub const DEFAULT_REPLICATION_FACTOR: usize = 2;

/// Default cap on an uploaded payload (whole-body buffering).
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

/// Immutable cluster configuration, resolved once at process start.
///
/// The peer list is the single source of truth for every component that
/// fans out to the cluster (placement, replication, reconciliation, delete
/// propagation, download fallback).
#[derive(Debug, Clone)]
pub struct ClusterTopology {
    pub node_id: String,
    pub port: u16,
    pub storage_root: PathBuf,
    pub peers: Vec<String>,
    pub replication_factor: usize,
    pub max_body_bytes: usize,
}

impl ClusterTopology {
    /// Reads `NODE_ID`, `PORT`, `STORAGE_ROOT`, `PEERS`,
    /// `REPLICATION_FACTOR` and `MAX_BODY_BYTES`. An explicit `PEERS` list
    /// overrides the static node table.
    pub fn from_env() -> Self {
        let node_id = env_or("NODE_ID", "s1");
        let port = env_or("PORT", "8080").parse().unwrap_or(8080);

        let peers = match std::env::var("PEERS") {
            Ok(raw) if !raw.trim().is_empty() => parse_peers(&raw),
            _ => static_peers(&node_id, port),
        };

        let replication_factor = std::env::var("REPLICATION_FACTOR")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_REPLICATION_FACTOR)
            .max(1);

        let max_body_bytes = std::env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);

        Self {
            node_id,
            port,
            storage_root: PathBuf::from(env_or("STORAGE_ROOT", "/app/storage")),
            peers,
            replication_factor,
            max_body_bytes,
        }
    }

    /// Fixed topology for tests: explicit peers, temp storage root.
    pub fn fixed(
        node_id: &str,
        port: u16,
        storage_root: impl Into<PathBuf>,
        peers: Vec<String>,
        replication_factor: usize,
    ) -> Self {
        Self {
            node_id: node_id.to_string(),
            port,
            storage_root: storage_root.into(),
            peers,
            replication_factor: replication_factor.max(1),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Base URL under which peers reach this node. The node id doubles as
    /// the DNS hostname inside the cluster.
    pub fn self_url(&self) -> String {
        format!("http://{}:{}", self.node_id, self.port)
    }

    /// Every node of the cluster, self first, then peers in configured
    /// order. This ordering is what keeps placement tie-breaks and
    /// inventory scans stable.
    pub fn all_nodes(&self) -> Vec<String> {
        let mut nodes = Vec::with_capacity(self.peers.len() + 1);
        nodes.push(self.self_url());
        nodes.extend(self.peers.iter().cloned());
        nodes
    }
}

pub(crate) fn parse_peers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(|peer| peer.trim_end_matches('/').to_string())
        .collect()
}

/// The well-known three-node table: every node peers with the other two.
fn static_peers(node_id: &str, port: u16) -> Vec<String> {
    const NODES: [&str; 3] = ["s1", "s2", "s3"];
    if !NODES.contains(&node_id) {
        return Vec::new();
    }
    NODES
        .iter()
        .filter(|id| **id != node_id)
        .map(|id| format!("http://{}:{}", id, port))
        .collect()
}
