//! End-to-end tests for data provider selection
//!
//! Drives the provider selector against live test servers, real settings
//! files and Sql catalogs on disk.

mod common;

use catalog_manager::providers::{
    DataProviderKind, FileSettingsStore, ProviderSelector, ProviderSettings, SettingsStore,
    WebApiClient,
};
use common::{sql_connection_string, TestServer, SQL_CATALOG_NAME};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn selector_for(settings_file: &std::path::Path) -> ProviderSelector {
    let store: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::new(settings_file));
    let probe = Arc::new(WebApiClient::new(Duration::from_secs(2)).unwrap());
    ProviderSelector::load(store, probe).unwrap()
}

// =============================================================================
// Rest provider
// =============================================================================

#[tokio::test]
async fn test_rest_validation_against_live_server() {
    let server = TestServer::spawn().await;
    let dir = TempDir::new().unwrap();
    let mut selector = selector_for(&dir.path().join("settings.toml"));

    selector.select(DataProviderKind::Rest);
    selector.set_service_url(&format!("{}/", server.base_url));
    let outcome = selector.validate().await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.title(), Some("Success"));
}

#[tokio::test]
async fn test_rest_validation_against_closed_port() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = TempDir::new().unwrap();
    let mut selector = selector_for(&dir.path().join("settings.toml"));

    selector.select(DataProviderKind::Rest);
    selector.set_service_url(&format!("http://127.0.0.1:{}", port));
    let outcome = selector.apply_changes().await;

    assert!(!outcome.is_ok());
    assert_eq!(outcome.title(), Some("Error accessing remote service"));
    assert_eq!(selector.persisted().provider, DataProviderKind::Local);
    assert!(!dir.path().join("settings.toml").exists());
}

#[tokio::test]
async fn test_applied_rest_settings_survive_reload() {
    let server = TestServer::spawn().await;
    let dir = TempDir::new().unwrap();
    let settings_file = dir.path().join("settings.toml");

    let mut selector = selector_for(&settings_file);
    selector.select(DataProviderKind::Rest);
    selector.set_service_url(&server.base_url);
    assert!(selector.apply_changes().await.is_ok());
    assert!(!selector.has_changes());

    let reloaded = ProviderSettings::load(&FileSettingsStore::new(&settings_file)).unwrap();
    assert_eq!(reloaded.provider, DataProviderKind::Rest);
    assert_eq!(reloaded.service_url, server.base_url);

    let selector = selector_for(&settings_file);
    assert_eq!(selector.persisted(), &reloaded);
}

// =============================================================================
// Sql provider
// =============================================================================

#[tokio::test]
async fn test_sql_catalog_created_from_selector() {
    let server_dir = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    let settings_file = dir.path().join("settings.toml");
    let mut selector = selector_for(&settings_file);

    selector.select(DataProviderKind::Sql);
    selector.set_sql_connection_string(&sql_connection_string(
        server_dir.path(),
        SQL_CATALOG_NAME,
    ));

    let outcome = selector.apply_changes().await;
    assert_eq!(outcome.title(), Some("Database not found"));
    assert!(!settings_file.exists());

    let outcome = selector.create_database(false).await;
    assert_eq!(outcome.title(), Some("Success"));
    assert_eq!(
        outcome.notice().unwrap().detail,
        "Database created successfully."
    );

    let outcome = selector.create_database(false).await;
    assert_eq!(outcome.title(), Some("Canceled"));

    let outcome = selector.apply_changes().await;
    assert!(outcome.is_ok());
    assert_eq!(
        outcome.notice().unwrap().detail,
        "The connection to the Sql Server succeeded."
    );

    let reloaded = ProviderSettings::load(&FileSettingsStore::new(&settings_file)).unwrap();
    assert_eq!(reloaded.provider, DataProviderKind::Sql);
}

#[tokio::test]
async fn test_sql_validation_with_missing_server_directory() {
    let dir = TempDir::new().unwrap();
    let mut selector = selector_for(&dir.path().join("settings.toml"));

    selector.select(DataProviderKind::Sql);
    selector.set_sql_connection_string(&sql_connection_string(
        &dir.path().join("no-such-server"),
        SQL_CATALOG_NAME,
    ));
    let outcome = selector.validate().await;

    assert_eq!(outcome.title(), Some("Error connecting to Sql Server"));
}

// =============================================================================
// Change notifications
// =============================================================================

#[tokio::test]
async fn test_discard_restores_persisted_and_notifies() {
    let dir = TempDir::new().unwrap();
    let mut selector = selector_for(&dir.path().join("settings.toml"));
    let mut changes = selector.subscribe();

    selector.select(DataProviderKind::Rest);
    assert!(changes.has_changed().unwrap());
    assert_eq!(changes.borrow_and_update().provider, DataProviderKind::Rest);

    selector.discard_changes();
    assert!(changes.has_changed().unwrap());
    assert_eq!(changes.borrow_and_update().provider, DataProviderKind::Local);
    assert!(!selector.has_changes());
}
