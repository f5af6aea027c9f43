use serde::{Deserialize, Serialize};

/// Directory record for one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub user_id: String,
    pub filename: String,
    /// Nodes holding a replica; index 0 is the node that accepted the
    /// upload and is consulted first on download.
    pub node_ids: Vec<String>,
    pub size_bytes: u64,
    /// Unix seconds of the upload.
    pub timestamp: u64,
}
