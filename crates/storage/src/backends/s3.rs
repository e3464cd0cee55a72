//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{MultipartSink, ObjectMeta, ObjectStore, PartBuffer};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_smithy_http_client::Builder as SmithyHttpClientBuilder;
use bytes::Bytes;
use tracing::instrument;

const DEFAULT_REGION: &str = "us-east-1";

fn sdk_error<E>(err: SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::S3(Box::new(err))
}

fn is_not_found<E>(err: &SdkError<E>) -> bool {
    match err {
        SdkError::ServiceError(service_err) => service_err.raw().status().as_u16() == 404,
        _ => false,
    }
}

/// Map an SDK error for a keyed operation, turning 404s into NotFound.
fn keyed_error<E>(err: SdkError<E>, key: &str) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    if is_not_found(&err) {
        StorageError::NotFound(key.to_string())
    } else {
        sdk_error(err)
    }
}

/// Endpoints configured as bare `host:port` (MinIO in a compose file) get
/// an explicit http scheme.
fn normalize_endpoint(raw: &str) -> String {
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

fn is_plain_http(url: &str) -> bool {
    url.get(..7).is_some_and(|s| s.eq_ignore_ascii_case("http://"))
}

/// S3-compatible object store using AWS SDK.
pub struct S3Backend {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    part_size: usize,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("part_size", &self.part_size)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// Credentials may be given explicitly; otherwise the SDK's ambient
    /// chain (env vars, profile, instance role) is used. `force_path_style`
    /// selects `endpoint/bucket/key` URLs, which MinIO and some other
    /// S3-compatible services require; AWS itself wants virtual-hosted
    /// style. `part_size` is the exact size of every multipart part except
    /// the last.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        prefix: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
        part_size: usize,
    ) -> StorageResult<Self> {
        let credentials = match (access_key_id, secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret, None, None, "static")),
            (None, None) => None,
            _ => {
                return Err(StorageError::Config(
                    "s3 credentials come as a pair: set both access_key_id and \
                     secret_access_key, or neither"
                        .to_string(),
                ));
            }
        };

        let region = Region::new(region.unwrap_or_else(|| DEFAULT_REGION.to_string()));
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(force_path_style);

        // Explicit credentials win over whatever the ambient chain found.
        if let Some(credentials) = credentials {
            builder = builder.credentials_provider(credentials);
        }

        if let Some(raw) = &endpoint {
            let endpoint_url = normalize_endpoint(raw);
            if is_plain_http(&endpoint_url) {
                // A plain-HTTP endpoint (local MinIO) gets an HTTP-only
                // client; the default one wants TLS trust roots.
                builder = builder.http_client(SmithyHttpClientBuilder::new().build_http());
            }
            builder = builder.endpoint_url(endpoint_url);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            // Trailing slashes would produce "prefix//key" object keys.
            prefix: prefix.map(|p| p.trim_end_matches('/').to_string()),
            part_size,
        })
    }

    /// Object key with the configured prefix applied.
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let full_key = self.full_key(key);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(sdk_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let full_key = self.full_key(key);
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| keyed_error(err, key))?;

        Ok(ObjectMeta {
            size: output.content_length().unwrap_or(0) as u64,
            content_type: output.content_type().map(|s| s.to_string()),
        })
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let full_key = self.full_key(key);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| keyed_error(err, key))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?
            .into_bytes();

        Ok(bytes)
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(content_type)
            .body(data.into())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn create_multipart(
        &self,
        key: &str,
        content_type: &str,
    ) -> StorageResult<Box<dyn MultipartSink>> {
        let full_key = self.full_key(key);

        let create_output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(content_type)
            .send()
            .await
            .map_err(sdk_error)?;

        let upload_id = create_output
            .upload_id()
            .ok_or_else(|| StorageError::Upload("S3 did not return upload_id".to_string()))?
            .to_string();

        tracing::debug!(key = %full_key, upload_id = %upload_id, "multipart upload created");

        Ok(Box::new(S3Sink {
            client: self.client.clone(),
            bucket: self.bucket.clone(),
            key: full_key,
            upload_id,
            parts: Vec::new(),
            part_number: 1,
            bytes_written: 0,
            buffer: PartBuffer::new(self.part_size),
        }))
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

/// Multipart sink for the S3 backend.
///
/// Parts are numbered from 1 in emission order and each upload completes
/// before the next begins, so the receipt list matches the archive byte
/// order the backend reassembles on `complete`.
struct S3Sink {
    client: Client,
    bucket: String,
    key: String,
    upload_id: String,
    parts: Vec<aws_sdk_s3::types::CompletedPart>,
    part_number: i32,
    bytes_written: u64,
    buffer: PartBuffer,
}

impl S3Sink {
    /// Upload a single part and record its receipt.
    async fn upload_part(&mut self, data: Bytes) -> StorageResult<()> {
        let upload_output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .part_number(self.part_number)
            .body(data.into())
            .send()
            .await
            .map_err(sdk_error)?;

        let completed_part = aws_sdk_s3::types::CompletedPart::builder()
            .e_tag(upload_output.e_tag().unwrap_or_default())
            .part_number(self.part_number)
            .build();

        tracing::debug!(key = %self.key, part_number = self.part_number, "uploaded part");

        self.parts.push(completed_part);
        self.part_number += 1;

        Ok(())
    }

    async fn seal_inner(&mut self, tail: Bytes) -> StorageResult<u64> {
        self.bytes_written += tail.len() as u64;
        for part in self.buffer.push(&tail) {
            self.upload_part(part).await?;
        }

        // The final part may be shorter than the configured part size.
        let remainder = self.buffer.take_remainder();
        if !remainder.is_empty() {
            self.upload_part(remainder).await?;
        }

        if self.parts.is_empty() {
            return Err(StorageError::Upload(
                "cannot seal a multipart upload with no parts".to_string(),
            ));
        }

        let completed_upload = aws_sdk_s3::types::CompletedMultipartUpload::builder()
            .set_parts(Some(self.parts.clone()))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(sdk_error)?;

        tracing::debug!(
            key = %self.key,
            parts = self.parts.len(),
            bytes = self.bytes_written,
            "multipart upload completed"
        );

        Ok(self.bytes_written)
    }

    /// Best-effort abort for failure paths inside the sink itself.
    async fn abort_inner(&self) {
        if let Err(err) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .send()
            .await
        {
            tracing::warn!(
                key = %self.key,
                upload_id = %self.upload_id,
                error = %err,
                "failed to abort multipart upload, orphaned parts may remain"
            );
        }
    }
}

#[async_trait]
impl MultipartSink for S3Sink {
    async fn append(&mut self, data: Bytes) -> StorageResult<()> {
        self.bytes_written += data.len() as u64;
        for part in self.buffer.push(&data) {
            self.upload_part(part).await?;
        }
        Ok(())
    }

    async fn flush_and_seal(mut self: Box<Self>, tail: Bytes) -> StorageResult<u64> {
        match self.seal_inner(tail).await {
            Ok(total) => Ok(total),
            Err(err) => {
                self.abort_inner().await;
                Err(err)
            }
        }
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }
}
