//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum part size accepted by S3-compatible backends (5 MiB).
pub const BACKEND_MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum number of parts accepted by S3-compatible backends.
pub const BACKEND_MAX_PART_COUNT: u64 = 10_000;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Registry (model hub) configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the Hugging Face-style registry API.
    #[serde(default = "default_registry_base_url")]
    pub base_url: String,
    /// Revision archived for every request.
    #[serde(default = "default_revision")]
    pub revision: String,
}

fn default_registry_base_url() -> String {
    "https://huggingface.co".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_base_url(),
            revision: default_revision(),
        }
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage (development and tests).
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the ambient credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO
        /// and some S3-compatible services; AWS S3 wants virtual-hosted style.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if let StorageConfig::S3 {
            access_key_id,
            secret_access_key,
            ..
        } = self
            && access_key_id.is_some() != secret_access_key.is_some()
        {
            return Err(
                "s3 credentials come as a pair: set both access_key_id and secret_access_key, \
                 or neither"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Multipart sink configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Part size for multipart uploads. Every part except the final one is
    /// exactly this size, so it is both the minimum and maximum part size.
    /// Must respect the backend floor of 5 MiB; combined with the backend's
    /// 10 000-part ceiling it also bounds the largest archive a single
    /// upload can carry.
    #[serde(default = "default_min_part_size")]
    pub min_part_size: usize,
}

fn default_min_part_size() -> usize {
    60 * 1024 * 1024
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            min_part_size: default_min_part_size(),
        }
    }
}

impl SinkConfig {
    /// Validate sink configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_part_size < BACKEND_MIN_PART_SIZE {
            return Err(format!(
                "sink.min_part_size {} is below the backend minimum of {} bytes",
                self.min_part_size, BACKEND_MIN_PART_SIZE
            ));
        }
        Ok(())
    }
}

/// Torrent generation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TorrentConfig {
    /// Tracker announce URL.
    #[serde(default = "default_announce")]
    pub announce: String,
    /// Producer identifier written into `created by`.
    #[serde(default = "default_created_by")]
    pub created_by: String,
    /// Torrent piece length in bytes. Must be a power of two.
    #[serde(default = "default_piece_length")]
    pub piece_length: usize,
    /// Public URL prefix under which stored archives are reachable.
    /// The web-seed URL is `<web_seed_base>/<owner>/<name>.zip`.
    pub web_seed_base: String,
}

fn default_announce() -> String {
    "udp://tracker.opentrackr.org:1337/announce".to_string()
}

fn default_created_by() -> String {
    format!("zipseed/{}", env!("CARGO_PKG_VERSION"))
}

fn default_piece_length() -> usize {
    1024 * 1024
}

impl TorrentConfig {
    /// Validate torrent configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.announce.is_empty() || !self.announce.contains("://") {
            return Err(format!(
                "torrent.announce is not a URL: {:?}",
                self.announce
            ));
        }
        if self.piece_length == 0 || !self.piece_length.is_power_of_two() {
            return Err(format!(
                "torrent.piece_length {} is not a power of two",
                self.piece_length
            ));
        }
        if self.web_seed_base.is_empty() {
            return Err("torrent.web_seed_base must be set".to_string());
        }
        Ok(())
    }

    /// Web-seed base with any trailing slash removed.
    pub fn web_seed_base_trimmed(&self) -> &str {
        self.web_seed_base.trim_end_matches('/')
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Multipart sink configuration.
    #[serde(default)]
    pub sink: SinkConfig,
    /// Torrent generation configuration (required: web_seed_base has no default).
    pub torrent: TorrentConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage and a localhost
    /// web-seed base.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            registry: RegistryConfig::default(),
            storage: StorageConfig::default(),
            sink: SinkConfig::default(),
            torrent: TorrentConfig {
                announce: default_announce(),
                created_by: default_created_by(),
                piece_length: default_piece_length(),
                web_seed_base: "http://localhost:9000/zipseed".to_string(),
            },
        }
    }

    /// Validate the full configuration, failing on the first error.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.sink.validate()?;
        self.torrent.validate()?;
        Ok(())
    }
}
