use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Default size of one chunk window. The last chunk of a file carries the
/// remainder and may be smaller.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ChunkStoreError {
    #[error("no chunks stored for {user_id}/{filename}")]
    NotFound { user_id: String, filename: String },

    #[error("unusable file name: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata of a locally stored file, derived entirely from the chunk
/// directory (no external lookups).
#[derive(Debug, Clone, Serialize)]
pub struct LocalFileMeta {
    pub filename: String,
    pub user_id: String,
    pub size_bytes: u64,
    pub size_mb: String,
    pub chunks: usize,
    pub modified: u64,
    pub location: String,
    pub available: bool,
}

/// Filesystem adapter for chunked file storage under one node's subtree.
///
/// All operations are keyed by `(user_id, filename)`; both components are
/// reduced to their final path segment, so a hostile `../../x` name cannot
/// escape `storage_root/node_id`.
pub struct ChunkStore {
    root: PathBuf,
    node_id: String,
    chunk_size: usize,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>, node_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            node_id: node_id.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk window, used by tests to exercise multi-chunk
    /// layouts without megabyte payloads.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Root of this node's subtree: `storage_root/node_id`.
    pub fn node_root(&self) -> PathBuf {
        self.root.join(&self.node_id)
    }

    fn sanitize(component: &str) -> Result<String, ChunkStoreError> {
        match Path::new(component).file_name() {
            Some(name) => Ok(name.to_string_lossy().into_owned()),
            None => Err(ChunkStoreError::InvalidName(component.to_string())),
        }
    }

    fn file_dir(&self, user_id: &str, filename: &str) -> Result<PathBuf, ChunkStoreError> {
        let user = Self::sanitize(user_id)?;
        let name = Self::sanitize(filename)?;
        Ok(self.node_root().join(user).join(name))
    }

    fn chunk_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("{}.chunk", index))
    }

    /// Splits `data` into contiguous chunk windows and writes them as
    /// `0.chunk .. n-1.chunk`. Returns the number of chunks written.
    ///
    /// A write error leaves the directory in a partial state; the
    /// reconciler repairs it on a later pass.
    pub async fn write(
        &self,
        user_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<usize, ChunkStoreError> {
        let dir = self.file_dir(user_id, filename)?;
        fs::create_dir_all(&dir).await?;

        let mut count = 0;
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + self.chunk_size).min(data.len());
            fs::write(Self::chunk_path(&dir, count), &data[offset..end]).await?;
            count += 1;
            offset = end;
        }
        Ok(count)
    }

    /// Reads chunks in index order into `sink`, stopping at the first
    /// missing index. Returns the total byte count.
    ///
    /// Fails with `NotFound` when index 0 is absent.
    pub async fn read_to<W>(
        &self,
        user_id: &str,
        filename: &str,
        sink: &mut W,
    ) -> Result<u64, ChunkStoreError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let dir = self.file_dir(user_id, filename)?;

        let mut total: u64 = 0;
        for index in 0.. {
            let chunk = match fs::read(Self::chunk_path(&dir, index)).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            };
            sink.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }

        if total == 0 {
            return Err(ChunkStoreError::NotFound {
                user_id: user_id.to_string(),
                filename: filename.to_string(),
            });
        }
        Ok(total)
    }

    /// Reconstructs the full payload into memory. The system holds whole
    /// payloads in a single buffer (uploads are capped at the HTTP layer).
    pub async fn read_all(
        &self,
        user_id: &str,
        filename: &str,
    ) -> Result<Vec<u8>, ChunkStoreError> {
        let mut buf = Vec::new();
        self.read_to(user_id, filename, &mut buf).await?;
        Ok(buf)
    }

    /// True iff at least one `*.chunk` entry exists for the file.
    pub async fn has_any(&self, user_id: &str, filename: &str) -> bool {
        let Ok(dir) = self.file_dir(user_id, filename) else {
            return false;
        };
        let Ok(mut entries) = fs::read_dir(&dir).await else {
            return false;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "chunk") {
                return true;
            }
        }
        false
    }

    /// Recursively removes the file directory. Succeeds if it is already
    /// absent.
    pub async fn delete(&self, user_id: &str, filename: &str) -> Result<(), ChunkStoreError> {
        let dir = self.file_dir(user_id, filename)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Lists every `(user_id, filename)` pair stored under this node's
    /// subtree. A missing node root yields an empty inventory.
    pub async fn enumerate_local(&self) -> Result<Vec<(String, String)>, ChunkStoreError> {
        let mut files = Vec::new();
        let mut users = match fs::read_dir(self.node_root()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(user_entry) = users.next_entry().await? {
            if !user_entry.path().is_dir() {
                continue;
            }
            let user_id = user_entry.file_name().to_string_lossy().into_owned();

            let mut file_dirs = match fs::read_dir(user_entry.path()).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            while let Some(file_entry) = file_dirs.next_entry().await? {
                if file_entry.path().is_dir() {
                    files.push((
                        user_id.clone(),
                        file_entry.file_name().to_string_lossy().into_owned(),
                    ));
                }
            }
        }
        Ok(files)
    }

    /// Number of files this node holds for one user (directories with at
    /// least one chunk). Feeds placement decisions.
    pub async fn user_file_count(&self, user_id: &str) -> usize {
        let Ok(user) = Self::sanitize(user_id) else {
            return 0;
        };
        let Ok(mut entries) = fs::read_dir(self.node_root().join(user)).await else {
            return 0;
        };

        let mut count = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if !entry.path().is_dir() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().into_owned();
            if self.has_any(user_id, &filename).await {
                count += 1;
            }
        }
        count
    }

    /// Counts stored files under any node's subtree of the shared storage
    /// root (deployments mount one volume per node; reads across subtrees
    /// are allowed, writes are not). `None` when the subtree is absent.
    pub async fn file_count_for(&self, node_id: &str) -> Option<usize> {
        let node = Self::sanitize(node_id).ok()?;
        let mut users = fs::read_dir(self.root.join(node)).await.ok()?;

        let mut count = 0;
        while let Ok(Some(user_entry)) = users.next_entry().await {
            if !user_entry.path().is_dir() {
                continue;
            }
            let Ok(mut file_dirs) = fs::read_dir(user_entry.path()).await else {
                continue;
            };
            while let Ok(Some(file_entry)) = file_dirs.next_entry().await {
                if file_entry.path().is_dir() {
                    count += 1;
                }
            }
        }
        Some(count)
    }

    /// Size, chunk count and latest modification time of a local file,
    /// computed by walking its chunk files in index order.
    pub async fn local_file_meta(
        &self,
        user_id: &str,
        filename: &str,
    ) -> Result<LocalFileMeta, ChunkStoreError> {
        if !self.has_any(user_id, filename).await {
            return Err(ChunkStoreError::NotFound {
                user_id: user_id.to_string(),
                filename: filename.to_string(),
            });
        }

        let dir = self.file_dir(user_id, filename)?;
        let mut size_bytes: u64 = 0;
        let mut chunks = 0;
        let mut modified = UNIX_EPOCH;

        for index in 0.. {
            let meta = match fs::metadata(Self::chunk_path(&dir, index)).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            };
            size_bytes += meta.len();
            chunks += 1;
            if let Ok(mtime) = meta.modified() {
                if mtime > modified {
                    modified = mtime;
                }
            }
        }

        Ok(LocalFileMeta {
            filename: filename.to_string(),
            user_id: user_id.to_string(),
            size_bytes,
            size_mb: format!("{:.2}", size_bytes as f64 / 1024.0 / 1024.0),
            chunks,
            modified: modified
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            location: self.node_id.clone(),
            available: true,
        })
    }
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("root", &self.root)
            .field("node_id", &self.node_id)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
