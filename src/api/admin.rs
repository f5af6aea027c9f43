//! Operational Handlers
//!
//! Read-outs for operators and the cluster UI: health summary, per-node
//! status, the global file view, counts, per-file info, and the manual
//! sync trigger. None of these mutate state except `/api/sync`, which
//! only schedules a reconciliation pass.

use axum::Json;
use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use std::sync::Arc;
use sysinfo::System;

use super::error::ApiError;
use super::handlers::now_unix;
use super::protocol::{
    ApiHealthResponse, ClusterStatusResponse, ClusterSummary, FileCountResponse, FileInfoResponse,
    GlobalFilesResponse, NodeFiles, NodeStatus, SyncResponse,
};
use crate::chunks::store::ChunkStore;
use crate::cluster::health::HealthTracker;
use crate::cluster::topology::ClusterTopology;
use crate::peers::client::PeerClient;
use crate::replication::reconciler::Reconciler;

/// `GET /api/health` — who this node is and which peers it can see.
pub async fn handle_api_health(
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(health): Extension<Arc<HealthTracker>>,
) -> Json<ApiHealthResponse> {
    let healthy_peers = health.healthy_peers(&topology).await;
    Json(ApiHealthResponse {
        node: topology.node_id.clone(),
        self_url: topology.self_url(),
        peers: topology.peers.clone(),
        healthy_peers,
        status: "ok".to_string(),
        timestamp: now_unix(),
    })
}

/// `GET /api/cluster/status` — per-node health plus process stats and the
/// last reconciliation summary.
pub async fn handle_cluster_status(
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(health): Extension<Arc<HealthTracker>>,
    Extension(reconciler): Extension<Arc<Reconciler>>,
) -> Json<ClusterStatusResponse> {
    let healthy = health.healthy_peers(&topology).await;

    let mut nodes = vec![NodeStatus {
        node: topology.node_id.clone(),
        url: topology.self_url(),
        status: "healthy".to_string(),
        is_self: true,
    }];
    for peer in &topology.peers {
        let status = if healthy.contains(peer) {
            "healthy"
        } else {
            "unhealthy"
        };
        nodes.push(NodeStatus {
            node: peer.clone(),
            url: peer.clone(),
            status: status.to_string(),
            is_self: false,
        });
    }

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo reports memory in bytes.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(ClusterStatusResponse {
        success: true,
        cluster: ClusterSummary {
            total_nodes: topology.peers.len() + 1,
            healthy_nodes: healthy.len() + 1,
            unhealthy_nodes: topology.peers.len() - healthy.len(),
            replication: topology.replication_factor,
        },
        nodes,
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
        last_sync: reconciler.last_summary(),
        timestamp: now_unix(),
    })
}

/// `GET /api/files/global` — this node's detailed file list plus each
/// peer's inventory with a reachability status.
pub async fn handle_global_files(
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
    Extension(health): Extension<Arc<HealthTracker>>,
    Extension(peers): Extension<Arc<PeerClient>>,
) -> Json<GlobalFilesResponse> {
    let mut results = Vec::new();

    let mut local_files = Vec::new();
    for (user_id, filename) in store.enumerate_local().await.unwrap_or_default() {
        if let Ok(meta) = store.local_file_meta(&user_id, &filename).await {
            if let Ok(value) = serde_json::to_value(meta) {
                local_files.push(value);
            }
        }
    }
    results.push(NodeFiles {
        node: topology.node_id.clone(),
        files: local_files,
        status: "local".to_string(),
    });

    let mut healthy_count = 1;
    for peer in &topology.peers {
        if !health.is_healthy(peer).await {
            results.push(NodeFiles {
                node: peer.clone(),
                files: Vec::new(),
                status: "unreachable".to_string(),
            });
            continue;
        }
        healthy_count += 1;
        let files = peers
            .inventory(peer)
            .await
            .into_iter()
            .filter_map(|entry| serde_json::to_value(entry).ok())
            .collect();
        results.push(NodeFiles {
            node: peer.clone(),
            files,
            status: "healthy".to_string(),
        });
    }

    Json(GlobalFilesResponse {
        success: true,
        nodes: results,
        healthy_count,
        total_nodes: topology.peers.len() + 1,
        replication: topology.replication_factor,
    })
}

#[derive(Debug, Deserialize)]
pub struct FileCountQuery {
    pub node: Option<String>,
}

/// `GET /api/files/count?node=s2` — stored-file count for one node's
/// subtree of the shared storage volume.
pub async fn handle_file_count(
    Query(query): Query<FileCountQuery>,
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
) -> Result<Json<FileCountResponse>, ApiError> {
    let node = query.node.unwrap_or_else(|| topology.node_id.clone());

    match store.file_count_for(&node).await {
        Some(count) => Ok(Json(FileCountResponse { node, count })),
        None => Err(ApiError::NotFound(format!("node folder not found: {}", node))),
    }
}

/// `GET /api/files/{user_id}/{filename}/info` — local chunk metadata,
/// else the first healthy peer that has it.
pub async fn handle_file_info(
    Path((user_id, filename)): Path<(String, String)>,
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
    Extension(health): Extension<Arc<HealthTracker>>,
    Extension(peers): Extension<Arc<PeerClient>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if store.has_any(&user_id, &filename).await {
        let meta = store.local_file_meta(&user_id, &filename).await?;
        let response = FileInfoResponse {
            success: true,
            file: meta,
        };
        return Ok(Json(
            serde_json::to_value(response)
                .map_err(|e| ApiError::Upstream(e.to_string()))?,
        ));
    }

    for peer in &topology.peers {
        if !health.is_healthy(peer).await {
            continue;
        }
        if let Some(info) = peers.file_info(peer, &user_id, &filename).await {
            return Ok(Json(info));
        }
    }

    Err(ApiError::NotFound("file not found in cluster".to_string()))
}

/// `POST /api/sync` — schedule one reconciliation pass now.
pub async fn handle_trigger_sync(
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(reconciler): Extension<Arc<Reconciler>>,
) -> Json<SyncResponse> {
    tokio::spawn(reconciler.clone().run_pass());

    Json(SyncResponse {
        success: true,
        status: "synchronization started".to_string(),
        node: topology.node_id.clone(),
    })
}
