//! Application state shared across handlers.

use std::sync::Arc;
use zipseed_core::config::AppConfig;
use zipseed_registry::RegistryClient;
use zipseed_storage::ObjectStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Object storage backend.
    pub storage: Arc<dyn ObjectStore>,
    /// Registry client.
    pub registry: Arc<RegistryClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails; the server must not start
    /// with a config that would only fail at request time.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        registry: Arc<RegistryClient>,
    ) -> Self {
        if let Err(error) = config.validate() {
            panic!("invalid configuration: {error}");
        }

        Self {
            config: Arc::new(config),
            storage,
            registry,
        }
    }
}
