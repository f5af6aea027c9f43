use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Extension, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use distributed_filestore::api::admin::{
    handle_api_health, handle_cluster_status, handle_file_count, handle_file_info,
    handle_global_files, handle_trigger_sync,
};
use distributed_filestore::api::handlers::{
    handle_delete, handle_download, handle_list_files, handle_upload,
};
use distributed_filestore::api::internal::{
    handle_health, handle_inventory, handle_raw_delete, handle_raw_get, handle_store_local,
};
use distributed_filestore::auth::{IdentityProvider, StaticTokenIdentity};
use distributed_filestore::chunks::store::ChunkStore;
use distributed_filestore::cluster::health::HealthTracker;
use distributed_filestore::cluster::placement::PlacementPlanner;
use distributed_filestore::cluster::topology::ClusterTopology;
use distributed_filestore::metadata::{InMemoryMetadataStore, MetadataStore};
use distributed_filestore::peers::client::PeerClient;
use distributed_filestore::peers::protocol::{
    ENDPOINT_FILES, ENDPOINT_FILES_RAW, ENDPOINT_HEALTH, ENDPOINT_STORE_LOCAL,
};
use distributed_filestore::replication::reconciler::Reconciler;
use distributed_filestore::replication::replicator::Replicator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let topology = Arc::new(ClusterTopology::from_env());
    tracing::info!(
        "NODE_ID={} storage={}",
        topology.node_id,
        topology.storage_root.display()
    );
    tracing::info!("SELF_URL={}", topology.self_url());
    tracing::info!("PEERS={:?}", topology.peers);
    tracing::info!(
        "REPLICATION_FACTOR={} MAX_BODY_BYTES={}",
        topology.replication_factor,
        topology.max_body_bytes
    );

    // 1. Local chunk storage; an unusable root is fatal.
    let store = Arc::new(ChunkStore::new(
        topology.storage_root.clone(),
        topology.node_id.clone(),
    ));
    tokio::fs::create_dir_all(store.node_root())
        .await
        .map_err(|e| anyhow::anyhow!("cannot create node storage: {}", e))?;

    // 2. External collaborator ports.
    let identity: Arc<dyn IdentityProvider> = Arc::new(StaticTokenIdentity::from_env()?);
    let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());

    // 3. Cluster plumbing.
    let peers = Arc::new(PeerClient::new());
    let health = Arc::new(HealthTracker::new(peers.clone()));
    let placement = Arc::new(PlacementPlanner::new(
        topology.clone(),
        health.clone(),
        peers.clone(),
        store.clone(),
    ));
    let replicator = Arc::new(Replicator::new(
        topology.clone(),
        health.clone(),
        peers.clone(),
    ));

    // 4. Background anti-entropy.
    let reconciler = Arc::new(Reconciler::new(
        topology.clone(),
        health.clone(),
        peers.clone(),
        store.clone(),
        metadata.clone(),
    ));
    reconciler.clone().spawn_loop();

    // 5. HTTP router.
    let app = Router::new()
        // Public, bearer-authenticated API
        .route("/api/upload", post(handle_upload))
        .route("/api/files", get(handle_list_files))
        .route("/api/files/global", get(handle_global_files))
        .route("/api/files/count", get(handle_file_count))
        // The router allows one parameter name per position: ":key" is the
        // filename for download/delete and the user id for the info route.
        .route(
            "/api/files/:key",
            get(handle_download).delete(handle_delete),
        )
        .route("/api/files/:key/:filename/info", get(handle_file_info))
        // Operational
        .route("/api/health", get(handle_api_health))
        .route("/api/cluster/status", get(handle_cluster_status))
        .route("/api/sync", post(handle_trigger_sync))
        // Internal peer-to-peer surface
        .route(ENDPOINT_HEALTH, get(handle_health))
        .route(ENDPOINT_FILES, get(handle_inventory))
        .route(
            &format!("{}/:user_id/:filename", ENDPOINT_FILES_RAW),
            get(handle_raw_get).delete(handle_raw_delete),
        )
        .route(ENDPOINT_STORE_LOCAL, post(handle_store_local))
        .layer(DefaultBodyLimit::max(topology.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(Extension(topology.clone()))
        .layer(Extension(store))
        .layer(Extension(peers))
        .layer(Extension(health))
        .layer(Extension(placement))
        .layer(Extension(replicator))
        .layer(Extension(reconciler))
        .layer(Extension(metadata))
        .layer(Extension(identity));

    // 6. Serve; a bind failure is fatal.
    let addr = SocketAddr::from(([0, 0, 0, 0], topology.port));
    tracing::info!("Starting distributed file storage API on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
