//! Public & Admin API Response DTOs
//!
//! Response shapes for the authenticated endpoints and the operational
//! read-outs. The inter-node DTOs live in `peers::protocol`; the types
//! here are only ever produced, never consumed, by this node.

use serde::Serialize;

use crate::chunks::store::LocalFileMeta;
use crate::metadata::FileRecord;
use crate::replication::reconciler::PassSummary;

/// `POST /api/upload`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub size_bytes: usize,
    pub stored_on: Vec<String>,
    pub chunks: usize,
    pub status: String,
}

/// `GET /api/files`.
#[derive(Debug, Serialize)]
pub struct UserFilesResponse {
    pub success: bool,
    pub user_id: String,
    pub files: Vec<FileRecord>,
}

/// `DELETE /api/files/{filename}`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct ApiHealthResponse {
    pub node: String,
    #[serde(rename = "self")]
    pub self_url: String,
    pub peers: Vec<String>,
    pub healthy_peers: Vec<String>,
    pub status: String,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct NodeStatus {
    pub node: String,
    pub url: String,
    pub status: String,
    #[serde(rename = "self")]
    pub is_self: bool,
}

#[derive(Debug, Serialize)]
pub struct ClusterSummary {
    pub total_nodes: usize,
    pub healthy_nodes: usize,
    pub unhealthy_nodes: usize,
    pub replication: usize,
}

/// `GET /api/cluster/status`.
#[derive(Debug, Serialize)]
pub struct ClusterStatusResponse {
    pub success: bool,
    pub cluster: ClusterSummary,
    pub nodes: Vec<NodeStatus>,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
    pub last_sync: Option<PassSummary>,
    pub timestamp: u64,
}

/// One node's slice of `GET /api/files/global`. Local files carry full
/// chunk metadata; peer files are bare inventory entries, so the payload
/// stays schemaless JSON.
#[derive(Debug, Serialize)]
pub struct NodeFiles {
    pub node: String,
    pub files: Vec<serde_json::Value>,
    pub status: String,
}

/// `GET /api/files/global`.
#[derive(Debug, Serialize)]
pub struct GlobalFilesResponse {
    pub success: bool,
    pub nodes: Vec<NodeFiles>,
    pub healthy_count: usize,
    pub total_nodes: usize,
    pub replication: usize,
}

/// `GET /api/files/count`.
#[derive(Debug, Serialize)]
pub struct FileCountResponse {
    pub node: String,
    pub count: usize,
}

/// `GET /api/files/{user_id}/{filename}/info`.
#[derive(Debug, Serialize)]
pub struct FileInfoResponse {
    pub success: bool,
    pub file: LocalFileMeta,
}

/// `POST /api/sync`.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub status: String,
    pub node: String,
}
