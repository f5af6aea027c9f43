use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use super::types::FileRecord;

/// Port over the external metadata directory.
///
/// Failures map to `Upstream` at the HTTP boundary; the in-memory
/// implementation below is infallible but the signatures keep the fallible
/// shape the external directory needs.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// The record for `(user_id, filename)`, if the directory knows it.
    async fn lookup(&self, user_id: &str, filename: &str) -> Result<Option<FileRecord>>;

    /// Every record owned by `user_id`.
    async fn list(&self, user_id: &str) -> Result<Vec<FileRecord>>;

    /// Insert or replace the record for `(record.user_id, record.filename)`.
    async fn upsert(&self, record: FileRecord) -> Result<()>;

    /// Remove the record; removing an unknown record is not an error.
    async fn delete(&self, user_id: &str, filename: &str) -> Result<()>;
}

/// Process-local directory backed by a concurrent map.
pub struct InMemoryMetadataStore {
    records: DashMap<(String, String), FileRecord>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn lookup(&self, user_id: &str, filename: &str) -> Result<Option<FileRecord>> {
        let key = (user_id.to_string(), filename.to_string());
        Ok(self.records.get(&key).map(|record| record.clone()))
    }

    async fn list(&self, user_id: &str) -> Result<Vec<FileRecord>> {
        let mut records: Vec<FileRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(records)
    }

    async fn upsert(&self, record: FileRecord) -> Result<()> {
        let key = (record.user_id.clone(), record.filename.clone());
        self.records.insert(key, record);
        Ok(())
    }

    async fn delete(&self, user_id: &str, filename: &str) -> Result<()> {
        let key = (user_id.to_string(), filename.to_string());
        self.records.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, name: &str, nodes: &[&str]) -> FileRecord {
        FileRecord {
            user_id: user.to_string(),
            filename: name.to_string(),
            node_ids: nodes.iter().map(|n| n.to_string()).collect(),
            size_bytes: 128,
            timestamp: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_upsert_lookup_roundtrip() {
        let store = InMemoryMetadataStore::new();
        store
            .upsert(record("u1", "a.bin", &["http://s1:8080"]))
            .await
            .unwrap();

        let found = store.lookup("u1", "a.bin").await.unwrap().unwrap();
        assert_eq!(found.node_ids, vec!["http://s1:8080".to_string()]);

        assert!(store.lookup("u1", "missing.bin").await.unwrap().is_none());
        assert!(store.lookup("u2", "a.bin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_filename_different_users_do_not_collide() {
        let store = InMemoryMetadataStore::new();
        store
            .upsert(record("u1", "a.bin", &["http://s1:8080"]))
            .await
            .unwrap();
        store
            .upsert(record("u2", "a.bin", &["http://s2:8080"]))
            .await
            .unwrap();

        let u1 = store.lookup("u1", "a.bin").await.unwrap().unwrap();
        let u2 = store.lookup("u2", "a.bin").await.unwrap().unwrap();
        assert_eq!(u1.node_ids, vec!["http://s1:8080".to_string()]);
        assert_eq!(u2.node_ids, vec!["http://s2:8080".to_string()]);

        store.delete("u1", "a.bin").await.unwrap();
        assert!(store.lookup("u1", "a.bin").await.unwrap().is_none());
        assert!(store.lookup("u2", "a.bin").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_is_per_user_and_sorted() {
        let store = InMemoryMetadataStore::new();
        store.upsert(record("u1", "b.bin", &[])).await.unwrap();
        store.upsert(record("u1", "a.bin", &[])).await.unwrap();
        store.upsert(record("u2", "c.bin", &[])).await.unwrap();

        let listed = store.list("u1").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
    }

    #[tokio::test]
    async fn test_delete_unknown_record_is_ok() {
        let store = InMemoryMetadataStore::new();
        store.delete("u1", "never.bin").await.unwrap();
    }
}
