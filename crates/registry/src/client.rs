//! HTTP client for a Hugging Face-style model registry.

use crate::error::{RegistryError, RegistryResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Url;
use serde::Deserialize;
use std::pin::Pin;

/// A repository identifier of the form `<owner>/<name>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Parse `<owner>/<name>`. Exactly one separator; both parts non-empty.
    pub fn parse(s: &str) -> RegistryResult<Self> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| RegistryError::InvalidRepo(format!("missing '/' separator: {s:?}")))?;

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(RegistryError::InvalidRepo(format!(
                "expected <owner>/<name>, got {s:?}"
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Archive file name, which doubles as the torrent `info.name`.
    pub fn zip_name(&self) -> String {
        format!("{}.zip", self.name)
    }

    /// Object-store key of the archive.
    pub fn zip_key(&self) -> String {
        format!("{}/{}.zip", self.owner, self.name)
    }

    /// Object-store key of the torrent.
    pub fn torrent_key(&self) -> String {
        format!("{}/{}.torrent", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One file in a repository revision, as reported by the tree endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoFile {
    /// Path relative to the repository root.
    pub path: String,
    /// Size hint from the tree listing, when the registry provides one.
    pub size: Option<u64>,
}

/// Raw tree entry as returned by the registry.
#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

/// An open file body: a byte stream plus the Content-Length hint.
pub struct FileStream {
    /// Content-Length of the response, if the registry sent one.
    pub content_length: Option<u64>,
    inner: Pin<Box<dyn Stream<Item = RegistryResult<Bytes>> + Send>>,
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl FileStream {
    /// Consume the handle, yielding the body chunk stream.
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = RegistryResult<Bytes>> + Send>> {
        self.inner
    }
}

/// Client for the registry's tree and blob endpoints.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RegistryClient {
    /// Create a client for the registry at `base_url`.
    pub fn new(base_url: &str) -> RegistryResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RegistryError::Url(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RegistryError::Url(format!(
                "base URL cannot carry paths: {base_url}"
            )));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    /// Build a URL from path segments, encoding each segment.
    fn url(&self, segments: impl IntoIterator<Item = impl AsRef<str>>) -> RegistryResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| RegistryError::Url(format!("base URL cannot carry paths: {}", self.base_url)))?;
            parts.pop_if_empty();
            for segment in segments {
                parts.push(segment.as_ref());
            }
        }
        Ok(url)
    }

    /// List the files of a repository revision, in registry order.
    ///
    /// Entries whose type is not `file` (directories, LFS pointers resolved
    /// server-side, etc.) are filtered out; the relative order of the rest
    /// is preserved so archives are reproducible for a fixed remote state.
    pub async fn list_files(&self, repo: &RepoId, revision: &str) -> RegistryResult<Vec<RepoFile>> {
        let url = self.url([
            "api",
            "models",
            repo.owner(),
            repo.name(),
            "tree",
            revision,
        ])?;

        tracing::debug!(repo = %repo, revision, "listing repository tree");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::List { status });
        }

        let entries: Vec<TreeEntry> = response.json().await.map_err(RegistryError::ListDecode)?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == "file")
            .map(|entry| RepoFile {
                path: entry.path,
                size: entry.size,
            })
            .collect())
    }

    /// Open a file's body as a byte stream.
    ///
    /// The request is sent and its status checked here, so a caller knows the
    /// body is available before committing any archive bytes for the file.
    pub async fn open_file(
        &self,
        repo: &RepoId,
        revision: &str,
        path: &str,
    ) -> RegistryResult<FileStream> {
        let mut segments: Vec<&str> = vec![repo.owner(), repo.name(), "resolve", revision];
        segments.extend(path.split('/'));
        let url = self.url(segments)?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Fetch {
                path: path.to_string(),
                status,
            });
        }

        let content_length = response.content_length();
        let inner = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RegistryError::Http))
            .boxed();

        Ok(FileStream {
            content_length,
            inner,
        })
    }
}
