//! Public API Handlers
//!
//! Bearer-authenticated endpoints: upload orchestration (placement, local
//! store + fan-out, or forward to the chosen peer), download across
//! replicas, delete propagation, and the per-user listing.

use axum::Json;
use axum::extract::{Extension, Multipart, Path};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::error::ApiError;
use super::protocol::{DeleteResponse, UploadResponse, UserFilesResponse};
use crate::auth::AuthedUser;
use crate::chunks::store::ChunkStore;
use crate::cluster::health::HealthTracker;
use crate::cluster::placement::PlacementPlanner;
use crate::cluster::topology::ClusterTopology;
use crate::metadata::{FileRecord, MetadataStore};
use crate::peers::client::PeerClient;
use crate::peers::protocol::{FIELD_FILE, FIELD_REPLICA, FIELD_USER_ID};
use crate::replication::replicator::Replicator;

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Parsed `multipart/form-data` body shared by `/api/upload` and
/// `/store-local`.
pub(crate) struct UploadPayload {
    pub filename: String,
    pub data: Vec<u8>,
    pub user_id: Option<String>,
    pub replica: bool,
}

pub(crate) async fn read_upload_payload(
    mut multipart: Multipart,
) -> Result<UploadPayload, ApiError> {
    let mut filename = None;
    let mut data = None;
    let mut user_id = None;
    let mut replica = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some(FIELD_FILE) => {
                filename = field.file_name().map(|n| n.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("failed to read file field: {}", e)))?;
                data = Some(bytes.to_vec());
            }
            Some(FIELD_USER_ID) => {
                user_id = Some(field.text().await.map_err(|e| {
                    ApiError::Validation(format!("failed to read user_id field: {}", e))
                })?);
            }
            Some(FIELD_REPLICA) => {
                let value = field.text().await.map_err(|e| {
                    ApiError::Validation(format!("failed to read replica field: {}", e))
                })?;
                replica = value == "1";
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ApiError::Validation("file field required".to_string()))?;
    let raw_name = filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::Validation("file name required".to_string()))?;

    // Only the final path component ever reaches the chunk store.
    let filename = std::path::Path::new(&raw_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ApiError::Validation(format!("unusable file name: {:?}", raw_name)))?;

    Ok(UploadPayload {
        filename,
        data,
        user_id,
        replica,
    })
}

/// Sniffs a MIME type from the payload head (≤512 bytes of magic).
pub(crate) fn sniff_content_type(data: &[u8]) -> String {
    let head = &data[..data.len().min(512)];
    infer::get(head)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

pub(crate) fn attachment_response(filename: &str, data: Vec<u8>) -> Response {
    let content_type = sniff_content_type(&data);
    (
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        data,
    )
        .into_response()
}

/// `POST /api/upload` — place the payload on the least-loaded healthy
/// node: store + replicate locally, or forward to the chosen peer.
pub async fn handle_upload(
    AuthedUser(user_id): AuthedUser,
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
    Extension(placement): Extension<Arc<PlacementPlanner>>,
    Extension(replicator): Extension<Arc<Replicator>>,
    Extension(peers): Extension<Arc<PeerClient>>,
    Extension(metadata): Extension<Arc<dyn MetadataStore>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let payload = read_upload_payload(multipart).await?;
    let filename = payload.filename;
    let data = payload.data;

    let target = placement.choose_target(&user_id).await;
    tracing::info!(
        "[upload] target node for user {}, file {}: {}",
        user_id,
        filename,
        target
    );

    let self_url = topology.self_url();
    let (stored_on, chunks) = if target == self_url {
        let chunks = store.write(&user_id, &filename, &data).await?;
        let stored_on = replicator.replicate(&user_id, &filename, &data).await;
        tracing::info!("[upload] replication finished: {:?}", stored_on);

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

        (stored_on, chunks)
    } else {
        peers
            .push(&target, &user_id, &filename, data.clone(), false)
            .await
            .map_err(|e| ApiError::Upstream(format!("forward to {} failed: {}", target, e)))?;
        // The target is now the accepting node; it runs its own
        // replication fan-out and records the metadata.
        (vec![target], 0)
    };

    Ok(Json(UploadResponse {
        success: true,
        filename: filename.clone(),
        file_path: format!("{}/{}/{}", self_url, user_id, filename),
        size_bytes: data.len(),
        stored_on,
        chunks,
        status: "stored".to_string(),
    }))
}

/// `GET /api/files/{filename}` — stream the file from the authoritative
/// node, else from any healthy replica.
pub async fn handle_download(
    AuthedUser(user_id): AuthedUser,
    Path(filename): Path<String>,
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
    Extension(health): Extension<Arc<HealthTracker>>,
    Extension(peers): Extension<Arc<PeerClient>>,
    Extension(metadata): Extension<Arc<dyn MetadataStore>>,
) -> Result<Response, ApiError> {
    let record = metadata
        .lookup(&user_id, &filename)
        .await
        .map_err(|e| ApiError::Upstream(format!("metadata lookup failed: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("file not found".to_string()))?;

    let self_url = topology.self_url();

    if let Some(first) = record.node_ids.first() {
        if *first == self_url {
            if store.has_any(&user_id, &filename).await {
                let data = store.read_all(&user_id, &filename).await?;
                return Ok(attachment_response(&filename, data));
            }
            tracing::warn!(
                "[download] metadata points at self but no local chunks for {}/{}",
                user_id,
                filename
            );
        } else if health.is_healthy(first).await {
            match peers.raw_get(first, &user_id, &filename).await {
                Ok(data) => return Ok(attachment_response(&filename, data)),
                Err(e) => {
                    tracing::warn!("[download] authoritative node {} failed: {}", first, e);
                }
            }
        } else {
            tracing::warn!(
                "[download] authoritative node {} not healthy, trying peers...",
                first
            );
        }
    }

    // Best-effort walk over the remaining replicas.
    for peer in &topology.peers {
        if !health.is_healthy(peer).await {
            continue;
        }
        match peers.raw_get(peer, &user_id, &filename).await {
            Ok(data) => return Ok(attachment_response(&filename, data)),
            Err(e) => tracing::debug!("[download] peer {} failed: {}", peer, e),
        }
    }

    Err(ApiError::NotFound(
        "file not found on any available node".to_string(),
    ))
}

/// `DELETE /api/files/{filename}` — remove locally, ask every peer to
/// remove, drop the metadata record.
pub async fn handle_delete(
    AuthedUser(user_id): AuthedUser,
    Path(filename): Path<String>,
    Extension(topology): Extension<Arc<ClusterTopology>>,
    Extension(store): Extension<Arc<ChunkStore>>,
    Extension(peers): Extension<Arc<PeerClient>>,
    Extension(metadata): Extension<Arc<dyn MetadataStore>>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if let Err(e) = store.delete(&user_id, &filename).await {
        tracing::warn!("[delete] failed to delete local copy: {}", e);
    }

    for peer in &topology.peers {
        if let Err(e) = peers.remove(peer, &user_id, &filename).await {
            tracing::warn!("[delete] peer {} delete failed: {}", peer, e);
        }
    }

    metadata
        .delete(&user_id, &filename)
        .await
        .map_err(|e| ApiError::Upstream(format!("metadata delete failed: {}", e)))?;

    Ok(Json(DeleteResponse { success: true }))
}

/// `GET /api/files` — the authenticated user's files, from the metadata
/// directory.
pub async fn handle_list_files(
    AuthedUser(user_id): AuthedUser,
    Extension(metadata): Extension<Arc<dyn MetadataStore>>,
) -> Result<Json<UserFilesResponse>, ApiError> {
    let files = metadata
        .list(&user_id)
        .await
        .map_err(|e| ApiError::Upstream(format!("metadata list failed: {}", e)))?;

    Ok(Json(UserFilesResponse {
        success: true,
        user_id,
        files,
    }))
}

#[cfg(test)]
mod tests {
    use super::sniff_content_type;

    #[test]
    fn test_sniff_known_magic() {
        let png = [0x89u8, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(sniff_content_type(&png), "image/png");

        let pdf = b"%PDF-1.7 something";
        assert_eq!(sniff_content_type(pdf), "application/pdf");
    }

    #[test]
    fn test_sniff_unknown_falls_back_to_octet_stream() {
        assert_eq!(sniff_content_type(b"plain bytes"), "application/octet-stream");
        assert_eq!(sniff_content_type(b""), "application/octet-stream");
    }
}
