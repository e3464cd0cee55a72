//! Local filesystem storage backend for development and tests.

use crate::error::{StorageError, StorageResult};
use crate::traits::{MultipartSink, ObjectMeta, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem object store.
///
/// Multipart semantics collapse to a temp file that is renamed into place on
/// seal; part sizing does not apply. Writes are atomic (temp file + rename).
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the full path for a key, rejecting keys that would escape the root.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }

        for component in Path::new(key).components() {
            match component {
                std::path::Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "contains unsafe path component: {key}"
                    )));
                }
            }
        }

        Ok(self.root.join(key))
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn temp_path_for(path: &Path) -> PathBuf {
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        )
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key)?;
        let metadata = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;

        Ok(ObjectMeta {
            size: metadata.len(),
            content_type: None,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key)?;
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        self.ensure_parent(&path).await?;

        // Write to a unique temp file, fsync, then rename for atomicity.
        let temp_path = Self::temp_path_for(&path);
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn create_multipart(
        &self,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<Box<dyn MultipartSink>> {
        let path = self.key_path(key)?;
        self.ensure_parent(&path).await?;

        let temp_path = Self::temp_path_for(&path);
        let file = fs::File::create(&temp_path).await?;

        Ok(Box::new(FilesystemSink {
            file: Some(file),
            temp_path,
            final_path: path,
            bytes_written: 0,
        }))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

/// Multipart sink writing through a temp file renamed into place on seal.
struct FilesystemSink {
    file: Option<fs::File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

impl FilesystemSink {
    fn file_mut(&mut self) -> StorageResult<&mut fs::File> {
        self.file
            .as_mut()
            .ok_or_else(|| StorageError::Upload("sink already sealed".to_string()))
    }

    async fn seal_inner(&mut self, tail: Bytes) -> StorageResult<u64> {
        self.bytes_written += tail.len() as u64;
        let file = self.file_mut()?;
        file.write_all(&tail).await?;
        file.sync_all().await?;
        self.file = None;

        fs::rename(&self.temp_path, &self.final_path).await?;
        Ok(self.bytes_written)
    }
}

#[async_trait]
impl MultipartSink for FilesystemSink {
    async fn append(&mut self, data: Bytes) -> StorageResult<()> {
        self.bytes_written += data.len() as u64;
        self.file_mut()?.write_all(&data).await?;
        Ok(())
    }

    async fn flush_and_seal(mut self: Box<Self>, tail: Bytes) -> StorageResult<u64> {
        match self.seal_inner(tail).await {
            Ok(total) => Ok(total),
            Err(err) => {
                // The consumed sink cannot be aborted by the caller; clean up
                // the temp file here.
                self.file = None;
                if let Err(cleanup_err) = fs::remove_file(&self.temp_path).await
                    && cleanup_err.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(
                        temp_path = %self.temp_path.display(),
                        error = %cleanup_err,
                        "failed to remove temp file after seal failure"
                    );
                }
                Err(err)
            }
        }
    }

    async fn abort(mut self: Box<Self>) -> StorageResult<()> {
        self.file = None;
        match fs::remove_file(&self.temp_path).await {
            Ok(()) => Ok(()),
            // Tolerate an upload that never wrote or was already cleaned up.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
