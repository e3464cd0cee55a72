//! Single-pass archive pipeline.
//!
//! One request walks the repository's file list once. Every archive byte --
//! ZIP framing and file content alike -- flows through a single tee that
//! feeds the multipart sink (for upload) and the piece hasher (for the
//! torrent), advancing the archive offset as it goes. The CRC engine sees
//! only file content. Three positions are therefore tracked independently:
//! the per-file content position (CRC), the archive offset (ZIP header
//! offsets), and the piece position (inside the hasher).
//!
//! The body request for a file is sent, and its status checked, before the
//! file's local header is emitted: a file that cannot be opened is skipped
//! with the archive untouched. Once a body byte has entered the sink it is
//! committed, so a mid-body failure is fatal and aborts the upload.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use bytes::Bytes;
use futures::StreamExt;
use time::OffsetDateTime;
use zipseed_core::hash::{Crc32, PieceDigests, PieceHasher};
use zipseed_core::torrent::{TorrentInfo, TorrentMeta};
use zipseed_core::zip::{self, FileEntry};
use zipseed_registry::{RegistryError, RepoFile, RepoId};
use zipseed_storage::MultipartSink;

/// Content type of stored archives.
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Content type of stored torrents.
pub const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

/// Summary of a completed archive request.
#[derive(Clone, Debug)]
pub struct ArchiveOutcome {
    /// Files included in the archive.
    pub files: usize,
    /// Files skipped because their body could not be fetched.
    pub skipped: usize,
    /// Final archive length in bytes.
    pub archive_len: u64,
    /// Number of torrent pieces.
    pub piece_count: usize,
}

/// Archive a repository revision into the object store and emit its torrent.
///
/// Any fatal error aborts the multipart upload before surfacing; the torrent
/// object is only written after the archive upload has completed.
pub async fn run(state: &AppState, repo: &RepoId) -> ApiResult<ArchiveOutcome> {
    let revision = state.config.registry.revision.clone();

    let files = state.registry.list_files(repo, &revision).await?;
    if files.is_empty() {
        return Err(ApiError::EmptyRepository(repo.to_string()));
    }

    let estimated: u64 = files.iter().filter_map(|f| f.size).sum();
    tracing::info!(
        repo = %repo,
        revision = %revision,
        files = files.len(),
        estimated_bytes = estimated,
        "starting archive pipeline"
    );

    let sink = state
        .storage
        .create_multipart(&repo.zip_key(), ZIP_CONTENT_TYPE)
        .await?;
    let mut pipeline = ArchivePipeline::new(sink, state.config.torrent.piece_length);

    match pipeline.build(state, repo, &revision, &files).await {
        Ok(outcome) => {
            tracing::info!(
                repo = %repo,
                files = outcome.files,
                skipped = outcome.skipped,
                archive_len = outcome.archive_len,
                pieces = outcome.piece_count,
                "archive pipeline finished"
            );
            Ok(outcome)
        }
        Err(err) => {
            pipeline.abort().await;
            Err(err)
        }
    }
}

/// Per-request pipeline state.
struct ArchivePipeline {
    /// Live upload; taken at seal (and by abort), so later aborts are no-ops.
    sink: Option<Box<dyn MultipartSink>>,
    pieces: PieceHasher,
    piece_length: usize,
    /// Archive offset: bytes emitted through the tee since archive start.
    offset: u64,
    entries: Vec<FileEntry>,
    skipped: usize,
}

impl ArchivePipeline {
    fn new(sink: Box<dyn MultipartSink>, piece_length: usize) -> Self {
        Self {
            sink: Some(sink),
            pieces: PieceHasher::new(piece_length),
            piece_length,
            offset: 0,
            entries: Vec::new(),
            skipped: 0,
        }
    }

    /// The tee: every archive byte passes through here exactly once, feeding
    /// the piece hasher and the sink and advancing the offset. Nothing else
    /// touches the offset.
    async fn emit(&mut self, bytes: Bytes) -> ApiResult<()> {
        let len = bytes.len() as u64;
        self.pieces.feed(&bytes);
        self.sink
            .as_mut()
            .ok_or_else(|| ApiError::Internal("sink used after seal".to_string()))?
            .append(bytes)
            .await?;
        self.offset += len;
        Ok(())
    }

    /// Stream every file, seal the archive, then build and store the torrent.
    async fn build(
        &mut self,
        state: &AppState,
        repo: &RepoId,
        revision: &str,
        files: &[RepoFile],
    ) -> ApiResult<ArchiveOutcome> {
        for file in files {
            self.add_file(state, repo, revision, &file.path).await?;
        }

        if self.entries.is_empty() {
            return Err(ApiError::EmptyArchive(repo.to_string()));
        }

        let (archive_len, digests) = self.seal().await?;

        let torrent_cfg = &state.config.torrent;
        let meta = TorrentMeta {
            announce: torrent_cfg.announce.clone(),
            created_by: torrent_cfg.created_by.clone(),
            creation_date: OffsetDateTime::now_utc().unix_timestamp(),
            info: TorrentInfo {
                length: archive_len,
                name: repo.zip_name(),
                piece_length: self.piece_length as u64,
                pieces: digests.pieces.clone(),
            },
            web_seed: format!(
                "{}/{}",
                torrent_cfg.web_seed_base_trimmed(),
                repo.zip_key()
            ),
        };
        let encoded = meta.to_bencode()?;

        state
            .storage
            .put(&repo.torrent_key(), Bytes::from(encoded), TORRENT_CONTENT_TYPE)
            .await?;

        Ok(ArchiveOutcome {
            files: self.entries.len(),
            skipped: self.skipped,
            archive_len,
            piece_count: digests.count,
        })
    }

    /// Stream one file: local header, body (CRC'd as it passes), descriptor.
    async fn add_file(
        &mut self,
        state: &AppState,
        repo: &RepoId,
        revision: &str,
        path: &str,
    ) -> ApiResult<()> {
        // Open the body before emitting anything: a file that cannot be
        // fetched is skipped and must leave no trace in the archive.
        let stream = match state.registry.open_file(repo, revision, path).await {
            Ok(stream) => stream,
            Err(err @ (RegistryError::Fetch { .. } | RegistryError::Http(_))) => {
                tracing::warn!(repo = %repo, path, error = %err, "skipping file: fetch failed");
                self.skipped += 1;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let header_offset = u32::try_from(self.offset).map_err(|_| {
            zipseed_core::Error::ArchiveTooLarge(format!(
                "local header offset {} exceeds 32-bit ZIP field",
                self.offset
            ))
        })?;

        let header = zip::local_file_header(path)?;
        self.emit(Bytes::from(header)).await?;

        let mut crc = Crc32::new();
        let mut size: u64 = 0;
        let mut chunks = stream.into_stream();
        while let Some(chunk) = chunks.next().await {
            // Body bytes already emitted are committed to the upload, so a
            // failure from here on cannot demote to a skip.
            let chunk = chunk.map_err(|err| {
                ApiError::Internal(format!("body stream for {path:?} failed mid-transfer: {err}"))
            })?;
            crc.update(&chunk);
            size += chunk.len() as u64;
            self.emit(chunk).await?;
        }

        let size = u32::try_from(size).map_err(|_| {
            zipseed_core::Error::ArchiveTooLarge(format!(
                "file {path:?} is {size} bytes, exceeding the 32-bit ZIP size field"
            ))
        })?;
        let crc = crc.finalize();

        self.emit(Bytes::copy_from_slice(&zip::data_descriptor(crc, size)))
            .await?;

        self.entries.push(FileEntry {
            name: path.to_string(),
            crc32: crc,
            size,
            local_header_offset: header_offset,
        });
        Ok(())
    }

    /// Assemble the central directory and EOCD, hand the tail to the sink's
    /// final flush, and finalize the piece hashes.
    async fn seal(&mut self) -> ApiResult<(u64, PieceDigests)> {
        let cd_offset = self.offset;

        let mut tail = Vec::new();
        for entry in &self.entries {
            zip::central_directory_entry(entry, "", &mut tail)?;
        }
        let cd_size = tail.len() as u64;
        zip::end_of_central_directory(self.entries.len(), cd_size, cd_offset, "", &mut tail)?;

        // The tail reaches the hasher through the tee but the sink through
        // the final flush.
        self.pieces.feed(&tail);
        let tail_len = tail.len() as u64;

        let sink = self
            .sink
            .take()
            .ok_or_else(|| ApiError::Internal("sink sealed twice".to_string()))?;
        let total = sink.flush_and_seal(Bytes::from(tail)).await?;
        self.offset += tail_len;

        if total != self.offset {
            return Err(ApiError::Internal(format!(
                "sink byte count {total} disagrees with archive offset {}",
                self.offset
            )));
        }

        let hasher = std::mem::replace(&mut self.pieces, PieceHasher::new(self.piece_length));
        Ok((self.offset, hasher.finalize()))
    }

    /// Abort the upload if one is still live. Abort errors are logged, never
    /// rethrown over the error that got us here.
    async fn abort(&mut self) {
        if let Some(sink) = self.sink.take()
            && let Err(err) = sink.abort().await
        {
            tracing::warn!(error = %err, "failed to abort multipart upload");
        }
    }
}

impl Drop for ArchivePipeline {
    fn drop(&mut self) {
        // A sink still present here means the request future was dropped
        // mid-flight (client disconnect, shutdown). Abort from a detached
        // task so the backend does not accumulate orphaned uploads.
        if let Some(sink) = self.sink.take() {
            tokio::spawn(async move {
                if let Err(err) = sink.abort().await {
                    tracing::warn!(
                        error = %err,
                        "failed to abort multipart upload after cancellation"
                    );
                }
            });
        }
    }
}
