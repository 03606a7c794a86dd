//! Test fixture creation
//!
//! Catalogs are created in temporary directories that are removed when the
//! returned [`TempDir`] is dropped.

use anyhow::Result;
use catalog_manager::catalog_store::LocalCatalogStore;
use catalog_manager::sql_provider::{ConnectionConfig, SchemaBootstrapper};
use std::path::Path;
use tempfile::TempDir;

/// Creates a seeded local catalog.
pub fn create_local_catalog() -> Result<(TempDir, LocalCatalogStore)> {
    let dir = TempDir::new()?;
    let store = LocalCatalogStore::open(dir.path().join("local_catalog.db"))?;
    Ok((dir, store))
}

pub fn sql_connection_string(server_dir: &Path, catalog: &str) -> String {
    format!(
        "Data Source={};Initial Catalog={};Connect Timeout=5",
        server_dir.display(),
        catalog
    )
}

/// Creates a server directory holding one Sql catalog, optionally seeded.
pub fn create_sql_catalog(fill: bool) -> Result<(TempDir, ConnectionConfig)> {
    let dir = TempDir::new()?;
    let config = ConnectionConfig::parse(&sql_connection_string(
        dir.path(),
        super::SQL_CATALOG_NAME,
    ))?;
    let bootstrapper = SchemaBootstrapper::new(&config)?;
    bootstrapper.create()?;
    if fill {
        bootstrapper.fill()?;
    }
    Ok((dir, config))
}
