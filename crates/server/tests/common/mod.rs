//! Server test utilities.

pub mod mocks;
pub mod zipcheck;

use httpmock::Method::GET;
use httpmock::MockServer;
use std::sync::Arc;
use tempfile::TempDir;
use zipseed_core::config::AppConfig;
use zipseed_registry::RegistryClient;
use zipseed_server::AppState;
use zipseed_storage::{FilesystemBackend, ObjectStore};

/// A test context with a mock registry and filesystem-backed storage.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestContext {
    pub registry: MockServer,
    pub state: AppState,
    pub storage: Arc<dyn ObjectStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a context archiving with the given piece length.
    pub async fn new(piece_length: usize) -> Self {
        let registry = MockServer::start_async().await;
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");

        let storage_path = temp_dir.path().join("storage");
        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("failed to create storage backend"),
        );

        let mut config = AppConfig::for_testing();
        config.registry.base_url = registry.base_url();
        config.torrent.piece_length = piece_length;
        config.torrent.web_seed_base = "http://cdn.test/zips".to_string();

        let client =
            RegistryClient::new(&registry.base_url()).expect("failed to build registry client");
        let state = AppState::new(config, storage.clone(), Arc::new(client));

        Self {
            registry,
            state,
            storage,
            _temp_dir: temp_dir,
        }
    }

    /// Build a context around an externally constructed storage backend.
    pub async fn with_storage(piece_length: usize, storage: Arc<dyn ObjectStore>) -> Self {
        let registry = MockServer::start_async().await;
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.registry.base_url = registry.base_url();
        config.torrent.piece_length = piece_length;
        config.torrent.web_seed_base = "http://cdn.test/zips".to_string();

        let client =
            RegistryClient::new(&registry.base_url()).expect("failed to build registry client");
        let state = AppState::new(config, storage.clone(), Arc::new(client));

        Self {
            registry,
            state,
            storage,
            _temp_dir: temp_dir,
        }
    }

    /// Mount a tree listing for `owner/model` at revision main.
    pub async fn mock_tree(&self, repo: &str, entries: serde_json::Value) {
        let path = format!("/api/models/{repo}/tree/main");
        self.registry
            .mock_async(move |when, then| {
                when.method(GET).path(path);
                then.status(200).json_body(entries);
            })
            .await;
    }

    /// Mount a file body for `owner/model` at revision main.
    pub async fn mock_file(&self, repo: &str, file_path: &str, body: &[u8]) {
        let path = format!("/{repo}/resolve/main/{file_path}");
        let body = body.to_vec();
        self.registry
            .mock_async(move |when, then| {
                when.method(GET).path(path);
                then.status(200).body(body);
            })
            .await;
    }

    /// Mount a failing file body for `owner/model` at revision main.
    pub async fn mock_file_error(&self, repo: &str, file_path: &str, status: u16) {
        let path = format!("/{repo}/resolve/main/{file_path}");
        self.registry
            .mock_async(move |when, then| {
                when.method(GET).path(path);
                then.status(status).body("upstream failure");
            })
            .await;
    }
}

/// Drive the router with a single request and collect the response.
#[allow(dead_code)]
pub async fn send_request(state: &AppState, uri: &str) -> (axum::http::StatusCode, String) {
    use tower::ServiceExt;

    let router = zipseed_server::create_router(state.clone());
    let request = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body_bytes).to_string())
}
