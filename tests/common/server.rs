//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own catalog.

use super::constants::*;
use super::fixtures::{create_local_catalog, create_sql_catalog};
use catalog_manager::catalog_store::{CatalogRepository, LocalCatalogStore};
use catalog_manager::providers::DataProviderKind;
use catalog_manager::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated catalog
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Repository behind the server, for direct access in tests
    pub repository: CatalogRepository,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server backed by a seeded local catalog on a random port
    ///
    /// # Panics
    ///
    /// Panics if the catalog cannot be created or the server does not start.
    pub async fn spawn() -> Self {
        let (temp_dir, store): (TempDir, LocalCatalogStore) =
            create_local_catalog().expect("Failed to create local catalog");
        Self::spawn_with(temp_dir, store.repository(), DataProviderKind::Local).await
    }

    /// Spawns a server backed by a seeded Sql catalog on a random port
    #[allow(dead_code)]
    pub async fn spawn_sql() -> Self {
        let (temp_dir, config) = create_sql_catalog(true).expect("Failed to create sql catalog");
        let repository = CatalogRepository::new(Arc::new(config));
        Self::spawn_with(temp_dir, repository, DataProviderKind::Sql).await
    }

    async fn spawn_with(
        temp_dir: TempDir,
        repository: CatalogRepository,
        provider: DataProviderKind,
    ) -> Self {
        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            provider,
        };
        let app = make_app(config, repository.clone());

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            repository,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home route
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
