//! Inter-node Wire Protocol
//!
//! Endpoint paths and DTOs for peer-to-peer communication. These are
//! serialized as JSON over HTTP (multipart for payload transfer) and are
//! shared by `PeerClient` and the internal API handlers, so the two sides
//! cannot drift apart.

use serde::{Deserialize, Serialize};

// --- Endpoints ---

/// Liveness probe; 200 means healthy.
pub const ENDPOINT_HEALTH: &str = "/health";
/// Full local inventory of `(user_id, filename)` pairs.
pub const ENDPOINT_FILES: &str = "/files";
/// Raw reconstructed bytes; GET/HEAD/DELETE per file.
pub const ENDPOINT_FILES_RAW: &str = "/files/raw";
/// Multipart store of a payload onto the receiving node.
pub const ENDPOINT_STORE_LOCAL: &str = "/store-local";

// --- DTOs ---

/// One stored file in a node's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub user_id: String,
    pub name: String,
}

/// Response of `GET /files`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InventoryResponse {
    pub node: String,
    pub files: Vec<FileEntry>,
}

/// Response of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Response of `POST /store-local`.
///
/// `stored_on` reflects actual placement: for a non-replica store it is the
/// receiver's own replication fan-out result; for a replica store it is just
/// the receiver.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreLocalResponse {
    pub success: bool,
    pub node: String,
    pub filename: String,
    pub user_id: String,
    pub chunks: usize,
    pub stored_on: Vec<String>,
    pub status: String,
}

/// Response of `DELETE /files/raw/{user}/{file}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RawDeleteResponse {
    pub success: bool,
    pub filename: String,
}

/// Multipart form field carrying the payload.
pub const FIELD_FILE: &str = "file";
/// Multipart form field carrying the owning user id.
pub const FIELD_USER_ID: &str = "user_id";
/// Multipart form field that, when set to `"1"`, marks the store as a
/// replica push: the receiver must not re-replicate.
pub const FIELD_REPLICA: &str = "replica";
