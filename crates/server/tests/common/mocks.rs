//! Mock storage backends for failure-path and accounting tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use zipseed_storage::error::{StorageError, StorageResult};
use zipseed_storage::traits::{MultipartSink, ObjectMeta, ObjectStore};

/// In-memory store recording every sink interaction.
///
/// Objects land in `objects` on seal/put; `appended` accumulates the chunks
/// handed to the live sink so tests can compare the committed prefix against
/// the final archive.
#[allow(dead_code)]
pub struct MemoryStore {
    pub objects: Arc<Mutex<HashMap<String, Bytes>>>,
    pub appended: Arc<Mutex<Vec<Bytes>>>,
    pub aborted: Arc<AtomicBool>,
    /// When set, the sink fails on the nth append (0-based).
    pub fail_append_at: Option<usize>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            appended: Arc::new(Mutex::new(Vec::new())),
            aborted: Arc::new(AtomicBool::new(false)),
            fail_append_at: None,
        })
    }

    pub fn failing_at(append_index: usize) -> Arc<Self> {
        Arc::new(Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            appended: Arc::new(Mutex::new(Vec::new())),
            aborted: Arc::new(AtomicBool::new(false)),
            fail_append_at: Some(append_index),
        })
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn appended_bytes(&self) -> Vec<u8> {
        let mut all = Vec::new();
        for chunk in self.appended.lock().unwrap().iter() {
            all.extend_from_slice(chunk);
        }
        all
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let objects = self.objects.lock().unwrap();
        let data = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectMeta {
            size: data.len() as u64,
            content_type: None,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn create_multipart(
        &self,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<Box<dyn MultipartSink>> {
        Ok(Box::new(MemorySink {
            key: key.to_string(),
            objects: self.objects.clone(),
            appended: self.appended.clone(),
            aborted: self.aborted.clone(),
            fail_append_at: self.fail_append_at,
            appends_seen: 0,
            buffer: Vec::new(),
        }))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySink {
    key: String,
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    appended: Arc<Mutex<Vec<Bytes>>>,
    aborted: Arc<AtomicBool>,
    fail_append_at: Option<usize>,
    appends_seen: usize,
    buffer: Vec<u8>,
}

#[async_trait]
impl MultipartSink for MemorySink {
    async fn append(&mut self, data: Bytes) -> StorageResult<()> {
        if self.fail_append_at == Some(self.appends_seen) {
            return Err(StorageError::Upload("injected append failure".to_string()));
        }
        self.appends_seen += 1;
        self.appended.lock().unwrap().push(data.clone());
        self.buffer.extend_from_slice(&data);
        Ok(())
    }

    async fn flush_and_seal(mut self: Box<Self>, tail: Bytes) -> StorageResult<u64> {
        self.buffer.extend_from_slice(&tail);
        let total = self.buffer.len() as u64;
        self.objects
            .lock()
            .unwrap()
            .insert(self.key.clone(), Bytes::from(self.buffer));
        Ok(total)
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.aborted.store(true, Ordering::SeqCst);
        Ok(())
    }
}
