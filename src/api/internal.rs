//! Internal Peer-to-Peer Handlers
//!
//! The unauthenticated surface other nodes consume through `PeerClient`:
//! liveness, inventory, raw file transfer and local store/delete. These
//! handlers only ever touch this node's own subtree.

use axum::Json;
use axum::extract::{Extension, Multipart, Path};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::error::ApiError;
use super::handlers::{now_unix, read_upload_payload};
use crate::chunks::store::ChunkStore;
use crate::cluster::topology::ClusterTopology;
use crate::metadata::{FileRecord, MetadataStore};
use crate::peers::protocol::{
    FileEntry, HealthResponse, InventoryResponse, RawDeleteResponse, StoreLocalResponse,
};
use crate::replication::replicator::Replicator;

/// `GET /health`.
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// `GET /files` — full local inventory from disk.
pub async fn handle_inventory(
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let files = store
        .enumerate_local()
        .await?
        .into_iter()
        .map(|(user_id, name)| FileEntry { user_id, name })
        .collect();

    Ok(Json(InventoryResponse {
        node: topology.node_id.clone(),
        files,
    }))
}

/// `GET|HEAD /files/raw/{user_id}/{filename}` — raw reconstructed bytes.
pub async fn handle_raw_get(
    Path((user_id, filename)): Path<(String, String)>,
    Extension(store): Extension<Arc<ChunkStore>>,
) -> Result<Response, ApiError> {
    if !store.has_any(&user_id, &filename).await {
        return Err(ApiError::NotFound("file not found".to_string()));
    }

    let data = store.read_all(&user_id, &filename).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream".to_string())],
        data,
    )
        .into_response())
}

/// `DELETE /files/raw/{user_id}/{filename}` — local removal only; the
/// caller (user delete fan-out or reconciler prune) owns the bigger
/// picture.
pub async fn handle_raw_delete(
    Path((user_id, filename)): Path<(String, String)>,
    Extension(store): Extension<Arc<ChunkStore>>,
) -> Result<Json<RawDeleteResponse>, ApiError> {
    store.delete(&user_id, &filename).await?;
    Ok(Json(RawDeleteResponse {
        success: true,
        filename,
    }))
}

/// `POST /store-local` — store a payload pushed by a peer.
///
/// Without the `replica` flag the receiver becomes the accepting node: it
/// runs its own replication fan-out and records the metadata. With the
/// flag it stores the copy and stops, which is what keeps replication
/// pushes from cascading around the cluster.
pub async fn handle_store_local(
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
    Extension(replicator): Extension<Arc<Replicator>>,
    Extension(metadata): Extension<Arc<dyn MetadataStore>>,
    multipart: Multipart,
) -> Result<Json<StoreLocalResponse>, ApiError> {
    let payload = read_upload_payload(multipart).await?;
    let user_id = payload
        .user_id
        .filter(|user| !user.is_empty())
        .ok_or_else(|| ApiError::Validation("user_id field required".to_string()))?;
    let filename = payload.filename;
    let data = payload.data;

    let chunks = store.write(&user_id, &filename, &data).await?;

    let stored_on = if payload.replica {
        vec![topology.self_url()]
    } else {
        let stored_on = replicator.replicate(&user_id, &filename, &data).await;
        metadata
            .upsert(FileRecord {
                user_id: user_id.clone(),
                filename: filename.clone(),
                node_ids: stored_on.clone(),
                size_bytes: data.len() as u64,
                timestamp: now_unix(),
            })
            .await
            .map_err(|e| ApiError::Upstream(format!("metadata update failed: {}", e)))?;
        stored_on
    };

    Ok(Json(StoreLocalResponse {
        success: true,
        node: topology.node_id.clone(),
        filename,
        user_id,
        chunks,
        stored_on,
        status: "stored locally".to_string(),
    }))
}
