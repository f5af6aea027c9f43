#[cfg(test)]
mod tests {
    use crate::cluster::health::HealthTracker;
    use crate::cluster::placement::least_loaded;
    use crate::cluster::topology::{ClusterTopology, parse_peers};
    use crate::peers::client::PeerClient;
    use std::sync::Arc;
    use std::time::Duration;

    fn counts(pairs: &[(&str, usize)]) -> Vec<(String, usize)> {
        pairs
            .iter()
            .map(|(node, count)| (node.to_string(), *count))
            .collect()
    }

    // ============================================================
    // TOPOLOGY
    // ============================================================

    #[test]
    fn test_static_peer_table() {
        let topology = ClusterTopology::fixed(
            "s2",
            8080,
            "/tmp/storage",
            parse_peers("http://s1:8080,http://s3:8080"),
            2,
        );

        assert_eq!(topology.self_url(), "http://s2:8080");
        assert_eq!(
            topology.all_nodes(),
            vec![
                "http://s2:8080".to_string(),
                "http://s1:8080".to_string(),
                "http://s3:8080".to_string(),
            ],
            "self must come first, peers in configured order"
        );
    }

    #[test]
    fn test_parse_peers_trims_and_skips_blanks() {
        let peers = parse_peers(" http://s2:8080 , , http://s3:8080/ ");
        assert_eq!(
            peers,
            vec!["http://s2:8080".to_string(), "http://s3:8080".to_string()]
        );
    }

    #[test]
    fn test_parse_peers_empty() {
        assert!(parse_peers("").is_empty());
        assert!(parse_peers(" , ,").is_empty());
    }

    // ============================================================
    // HEALTH GRACE WINDOW
    // ============================================================

    // The probe itself needs a live peer and is covered by cluster
    // integration tests; here the probe always fails (nothing listens on
    // the target port) and only the positive cache decides.

    #[tokio::test]
    async fn test_recent_observation_keeps_peer_healthy() {
        let tracker = HealthTracker::new(Arc::new(PeerClient::new()));
        let peer = "http://127.0.0.1:9";

        tracker.record_healthy(peer);
        assert!(
            tracker.is_healthy(peer).await,
            "a peer seen within the grace window stays healthy through a failed probe"
        );
    }

    #[tokio::test]
    async fn test_expired_observation_is_unhealthy() {
        let tracker =
            HealthTracker::new(Arc::new(PeerClient::new())).with_grace(Duration::ZERO);
        let peer = "http://127.0.0.1:9";

        tracker.record_healthy(peer);
        assert!(!tracker.is_healthy(peer).await);
    }

    #[tokio::test]
    async fn test_unknown_peer_is_unhealthy() {
        let tracker = HealthTracker::new(Arc::new(PeerClient::new()));
        assert!(!tracker.is_healthy("http://127.0.0.1:9").await);
    }

    // ============================================================
    // PLACEMENT
    // ============================================================

    #[test]
    fn test_least_loaded_picks_strict_minimum() {
        let picked = least_loaded(&counts(&[
            ("http://s1:8080", 5),
            ("http://s2:8080", 0),
            ("http://s3:8080", 2),
        ]));
        assert_eq!(picked.as_deref(), Some("http://s2:8080"));
    }

    #[test]
    fn test_least_loaded_tie_goes_to_first_candidate() {
        // Self is always the first candidate, so an all-equal cluster
        // keeps the upload on the accepting node.
        let picked = least_loaded(&counts(&[
            ("http://s1:8080", 0),
            ("http://s2:8080", 0),
            ("http://s3:8080", 0),
        ]));
        assert_eq!(picked.as_deref(), Some("http://s1:8080"));
    }

    #[test]
    fn test_least_loaded_monotonicity() {
        // A strictly smaller candidate wins no matter where it sits.
        for position in 0..3 {
            let mut nodes = counts(&[
                ("http://s1:8080", 4),
                ("http://s2:8080", 4),
                ("http://s3:8080", 4),
            ]);
            nodes[position].1 = 1;
            let expected = nodes[position].0.clone();
            assert_eq!(least_loaded(&nodes), Some(expected));
        }
    }

    #[test]
    fn test_least_loaded_empty() {
        assert_eq!(least_loaded(&[]), None);
    }
}
