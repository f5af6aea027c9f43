#[cfg(test)]
mod tests {
    use crate::chunks::store::ChunkStore;
    use crate::cluster::health::HealthTracker;
    use crate::cluster::topology::ClusterTopology;
    use crate::metadata::{FileRecord, InMemoryMetadataStore, MetadataStore};
    use crate::peers::client::PeerClient;
    use crate::replication::reconciler::{
        Reconciler, merge_inventory, repair_targets, surplus_replicas,
    };
    use crate::replication::replicator::Replicator;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn urls(nodes: &[&str]) -> Vec<String> {
        nodes.iter().map(|n| n.to_string()).collect()
    }

    // ============================================================
    // INVENTORY MERGE
    // ============================================================

    #[test]
    fn test_merge_inventory_keeps_scan_order() {
        let scans = vec![
            (
                "http://s1:8080".to_string(),
                vec![("u1".to_string(), "a.bin".to_string())],
            ),
            (
                "http://s2:8080".to_string(),
                vec![
                    ("u1".to_string(), "a.bin".to_string()),
                    ("u1".to_string(), "b.bin".to_string()),
                ],
            ),
            (
                "http://s3:8080".to_string(),
                vec![("u1".to_string(), "a.bin".to_string())],
            ),
        ];

        let merged = merge_inventory(scans);
        assert_eq!(
            merged[&("u1".to_string(), "a.bin".to_string())],
            urls(&["http://s1:8080", "http://s2:8080", "http://s3:8080"]),
            "holders must preserve scan order, the first one is the repair source"
        );
        assert_eq!(
            merged[&("u1".to_string(), "b.bin".to_string())],
            urls(&["http://s2:8080"])
        );
    }

    #[test]
    fn test_merge_inventory_same_name_different_users() {
        let scans = vec![
            (
                "http://s1:8080".to_string(),
                vec![("u1".to_string(), "a.bin".to_string())],
            ),
            (
                "http://s2:8080".to_string(),
                vec![("u2".to_string(), "a.bin".to_string())],
            ),
        ];

        let merged = merge_inventory(scans);
        assert_eq!(merged.len(), 2, "files are keyed by (user, name), not name");
    }

    #[test]
    fn test_merge_inventory_deduplicates_node() {
        let scans = vec![(
            "http://s1:8080".to_string(),
            vec![
                ("u1".to_string(), "a.bin".to_string()),
                ("u1".to_string(), "a.bin".to_string()),
            ],
        )];

        let merged = merge_inventory(scans);
        assert_eq!(
            merged[&("u1".to_string(), "a.bin".to_string())],
            urls(&["http://s1:8080"])
        );
    }

    // ============================================================
    // OVER-REPLICATION PRUNING
    // ============================================================

    #[test]
    fn test_surplus_is_sorted_suffix() {
        let holders = urls(&["http://s3:8080", "http://s1:8080", "http://s2:8080"]);
        assert_eq!(surplus_replicas(&holders, 2), urls(&["http://s3:8080"]));
    }

    #[test]
    fn test_surplus_is_deterministic_across_orderings() {
        let a = urls(&["http://s2:8080", "http://s3:8080", "http://s1:8080"]);
        let b = urls(&["http://s3:8080", "http://s1:8080", "http://s2:8080"]);
        assert_eq!(surplus_replicas(&a, 2), surplus_replicas(&b, 2));
    }

    #[test]
    fn test_no_surplus_at_or_below_factor() {
        let holders = urls(&["http://s1:8080", "http://s2:8080"]);
        assert!(surplus_replicas(&holders, 2).is_empty());
        assert!(surplus_replicas(&holders, 3).is_empty());
        assert!(surplus_replicas(&[], 2).is_empty());
    }

    #[test]
    fn test_surplus_multiple_extras() {
        let holders = urls(&[
            "http://s4:8080",
            "http://s2:8080",
            "http://s1:8080",
            "http://s3:8080",
        ]);
        assert_eq!(
            surplus_replicas(&holders, 2),
            urls(&["http://s3:8080", "http://s4:8080"])
        );
    }

    // ============================================================
    // UNDER-REPLICATION TARGET SELECTION
    // ============================================================

    #[test]
    fn test_targets_first_healthy_non_holder() {
        // {a.bin: [s1]}, R=2, everyone healthy: push to s2 only.
        let targets = repair_targets(
            &urls(&["http://s1:8080"]),
            &urls(&["http://s2:8080", "http://s3:8080"]),
            "http://s1:8080",
            2,
        );
        assert_eq!(targets, urls(&["http://s2:8080"]));
    }

    #[test]
    fn test_targets_skip_existing_holders() {
        let targets = repair_targets(
            &urls(&["http://s2:8080"]),
            &urls(&["http://s2:8080", "http://s3:8080"]),
            "http://s1:8080",
            2,
        );
        assert_eq!(targets, urls(&["http://s3:8080"]));
    }

    #[test]
    fn test_targets_capped_at_missing_count() {
        let targets = repair_targets(
            &urls(&["http://s1:8080"]),
            &urls(&["http://s2:8080", "http://s3:8080", "http://s4:8080"]),
            "http://s1:8080",
            3,
        );
        assert_eq!(targets, urls(&["http://s2:8080", "http://s3:8080"]));
    }

    #[test]
    fn test_self_is_fallback_when_no_healthy_non_holder() {
        let targets = repair_targets(
            &urls(&["http://s2:8080"]),
            &[],
            "http://s1:8080",
            2,
        );
        assert_eq!(targets, urls(&["http://s1:8080"]));
    }

    #[test]
    fn test_no_fallback_when_self_already_holds() {
        let targets = repair_targets(
            &urls(&["http://s1:8080"]),
            &[],
            "http://s1:8080",
            2,
        );
        assert!(targets.is_empty());
    }

    #[test]
    fn test_no_targets_when_factor_satisfied() {
        let targets = repair_targets(
            &urls(&["http://s1:8080", "http://s2:8080"]),
            &urls(&["http://s3:8080"]),
            "http://s1:8080",
            2,
        );
        assert!(targets.is_empty());
    }

    // ============================================================
    // REPLICATOR / RECONCILER (single-node paths)
    // ============================================================

    // Cross-node flows need a running peer HTTP server and are covered by
    // cluster integration tests; these exercise the no-peer degenerate
    // cases, which must still behave.

    #[tokio::test]
    async fn test_replicate_with_no_peers_keeps_upload_local() {
        let dir = tempdir().unwrap();
        let topology = Arc::new(ClusterTopology::fixed("s1", 8080, dir.path(), vec![], 2));
        let peers = Arc::new(PeerClient::new());
        let health = Arc::new(HealthTracker::new(peers.clone()));
        let replicator = Replicator::new(topology.clone(), health, peers);

        let stored_on = replicator.replicate("u1", "a.bin", b"payload").await;
        assert_eq!(stored_on, vec![topology.self_url()]);
    }

    #[tokio::test]
    async fn test_run_pass_records_summary_without_peers() {
        let dir = tempdir().unwrap();
        let topology = Arc::new(ClusterTopology::fixed("s1", 8080, dir.path(), vec![], 2));
        let store = Arc::new(ChunkStore::new(dir.path(), "s1").with_chunk_size(8));
        store.write("u1", "a.bin", b"payload").await.unwrap();

        let peers = Arc::new(PeerClient::new());
        let health = Arc::new(HealthTracker::new(peers.clone()));
        let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let reconciler = Arc::new(Reconciler::new(
            topology, health, peers, store, metadata,
        ));

        reconciler.clone().run_pass().await;

        let summary = reconciler.last_summary().expect("pass must record a summary");
        assert_eq!(summary.files_seen, 1);
        // Under-replicated, but self already holds it and no peer is
        // reachable: skipped, not failed.
        assert_eq!(summary.repaired, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_run_pass_exact_factor_is_no_op() {
        let dir = tempdir().unwrap();
        let topology = Arc::new(ClusterTopology::fixed("s1", 8080, dir.path(), vec![], 1));
        let store = Arc::new(ChunkStore::new(dir.path(), "s1").with_chunk_size(8));
        store.write("u1", "a.bin", b"payload").await.unwrap();

        let peers = Arc::new(PeerClient::new());
        let health = Arc::new(HealthTracker::new(peers.clone()));
        let metadata: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let reconciler = Arc::new(Reconciler::new(
            topology, health, peers, store.clone(), metadata,
        ));

        reconciler.clone().run_pass().await;

        let summary = reconciler.last_summary().unwrap();
        assert_eq!(summary.files_seen, 1);
        assert_eq!(summary.repaired, 0);
        assert_eq!(summary.pruned, 0);
        assert!(store.has_any("u1", "a.bin").await, "exact factor must not touch the file");
    }

    #[tokio::test]
    async fn test_pass_leaves_metadata_untouched() {
        // With R=1 and a single local holder the file is exactly
        // replicated; a pass must not disturb the directory record.
        let dir = tempdir().unwrap();
        let topology = Arc::new(ClusterTopology::fixed("s1", 8080, dir.path(), vec![], 1));
        let store = Arc::new(ChunkStore::new(dir.path(), "s1").with_chunk_size(8));
        store.write("u1", "a.bin", b"payload").await.unwrap();

        let peers = Arc::new(PeerClient::new());
        let health = Arc::new(HealthTracker::new(peers.clone()));
        let metadata = Arc::new(InMemoryMetadataStore::new());
        metadata
            .upsert(FileRecord {
                user_id: "u1".to_string(),
                filename: "a.bin".to_string(),
                node_ids: vec!["http://s1:8080".to_string()],
                size_bytes: 7,
                timestamp: 1_700_000_000,
            })
            .await
            .unwrap();

        let reconciler = Arc::new(Reconciler::new(
            topology,
            health,
            peers,
            store,
            metadata.clone(),
        ));
        reconciler.clone().run_pass().await;

        assert!(metadata.lookup("u1", "a.bin").await.unwrap().is_some());
    }
}
