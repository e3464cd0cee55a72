//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Content type (if the backend records one).
    pub content_type: Option<String>,
}

/// Object store abstraction.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's metadata without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object atomically.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Start a multipart upload for a streamed object.
    async fn create_multipart(
        &self,
        key: &str,
        content_type: &str,
    ) -> StorageResult<Box<dyn MultipartSink>>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the name of this storage backend, for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// Called during server startup so a misconfigured backend fails fast
    /// instead of failing the first request.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// An in-order multipart upload of a byte stream of unknown length.
///
/// Bytes accepted by `append` are committed to the stream: the sink may have
/// already shipped them to the backend, so a caller that hits a later error
/// must `abort` rather than retry. Parts are emitted in archive order with
/// contiguous part numbers; every part except the final one has exactly the
/// configured part size.
#[async_trait]
pub trait MultipartSink: Send {
    /// Enqueue bytes, uploading full parts as they accumulate.
    async fn append(&mut self, data: Bytes) -> StorageResult<()>;

    /// Append `tail`, upload any remainder as the final (possibly short)
    /// part, and complete the upload. Returns the total bytes written.
    /// On failure the implementation cancels the upload before returning,
    /// since the consumed sink can no longer be aborted by the caller.
    async fn flush_and_seal(self: Box<Self>, tail: Bytes) -> StorageResult<u64>;

    /// Cancel the upload. Must tolerate an upload the backend no longer
    /// knows about.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}

/// Pending-byte buffer that slices a stream into exact fixed-size parts.
///
/// Backends drive their upload calls from the parts this returns, which
/// keeps the part-size discipline in one place: after any `push`, pending
/// data is strictly shorter than one part.
#[derive(Debug)]
pub struct PartBuffer {
    part_size: usize,
    pending: Vec<u8>,
}

impl PartBuffer {
    /// Create a buffer emitting parts of exactly `part_size` bytes.
    pub fn new(part_size: usize) -> Self {
        assert!(part_size > 0, "part size must be positive");
        Self {
            part_size,
            pending: Vec::with_capacity(part_size),
        }
    }

    /// Append bytes, returning every completed part in order.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.pending.extend_from_slice(data);

        let mut parts = Vec::new();
        while self.pending.len() >= self.part_size {
            let part: Vec<u8> = self.pending.drain(..self.part_size).collect();
            parts.push(Bytes::from(part));
        }
        parts
    }

    /// Take the pending remainder (shorter than one part; possibly empty).
    pub fn take_remainder(&mut self) -> Bytes {
        Bytes::from(std::mem::take(&mut self.pending))
    }

    /// Bytes currently pending.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
