use super::connection::ConnectionConfig;
use super::script::{render, split_batches, CREATE_DB_SCRIPT};
use crate::catalog_store::{seed, CatalogRepository};
use crate::error::{CatalogError, CatalogResult};
use rusqlite::OptionalExtension;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Schema version written by [`SchemaBootstrapper::create`] and expected by
/// [`SchemaBootstrapper::is_current`].
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

/// Creates and inspects a Sql catalog through the administrative database.
#[derive(Debug, Clone)]
pub struct SchemaBootstrapper {
    master: ConnectionConfig,
    target: ConnectionConfig,
}

impl SchemaBootstrapper {
    /// Fails when the configuration does not name a usable target catalog.
    pub fn new(config: &ConnectionConfig) -> CatalogResult<Self> {
        Ok(SchemaBootstrapper {
            master: config.with_master_catalog()?,
            target: config.with_target_catalog()?,
        })
    }

    pub fn catalog_name(&self) -> CatalogResult<&str> {
        self.target.target_catalog()
    }

    pub fn target(&self) -> &ConnectionConfig {
        &self.target
    }

    /// True when the target catalog is registered in the administrative
    /// database.
    pub fn exists(&self) -> CatalogResult<bool> {
        let conn = self.master.open()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_databases WHERE name = ?1",
            [self.catalog_name()?],
            |r| r.get(0),
        )?;
        Ok(count == 1)
    }

    pub fn try_current_version(&self) -> CatalogResult<Option<String>> {
        let conn = self.target.open()?;
        let version = conn
            .query_row("SELECT [Current] FROM Version LIMIT 1", [], |r| {
                r.get::<_, String>(0)
            })
            .optional()?;
        Ok(version)
    }

    /// The stored schema version, or an empty string when it cannot be read.
    pub fn current_version(&self) -> String {
        match self.try_current_version() {
            Ok(Some(version)) => version,
            Ok(None) => {
                warn!("No schema version stored in {}", self.target.redacted());
                String::new()
            }
            Err(err) => {
                warn!(
                    "Failed to read schema version of {}: {}",
                    self.target.redacted(),
                    err
                );
                String::new()
            }
        }
    }

    pub fn is_current(&self) -> bool {
        self.current_version() == CURRENT_SCHEMA_VERSION
    }

    /// Runs the creation script against the administrative database and
    /// stamps the version marker.
    ///
    /// Batches are not wrapped in a transaction. When one fails, the ones
    /// before it stay applied.
    pub fn create(&self) -> CatalogResult<()> {
        let name = self.catalog_name()?;
        let file = self.target.target_database_path()?;
        let script = render(CREATE_DB_SCRIPT, name, &file);

        let conn = self.master.open()?;
        let batches = split_batches(&script);
        info!(
            "Creating catalog {} at {:?} ({} batches)",
            name,
            file,
            batches.len()
        );
        for (index, batch) in batches.iter().enumerate() {
            debug!("Running batch {}", index);
            conn.execute_batch(batch).map_err(|e| {
                CatalogError::Schema(format!(
                    "Batch {} of the creation script failed: {}",
                    index, e
                ))
            })?;
        }

        conn.execute(
            &format!("INSERT INTO \"{}\".Version ([Current]) VALUES (?1)", name),
            [CURRENT_SCHEMA_VERSION],
        )?;
        info!("Catalog {} created with version {}", name, CURRENT_SCHEMA_VERSION);
        Ok(())
    }

    /// Inserts the seed data into the target catalog.
    pub fn fill(&self) -> CatalogResult<()> {
        seed::fill(&self.repository())
    }

    pub fn repository(&self) -> CatalogRepository {
        CatalogRepository::new(Arc::new(self.target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, catalog: &str) -> ConnectionConfig {
        ConnectionConfig::parse(&format!(
            "Data Source={};Initial Catalog={}",
            dir.path().display(),
            catalog
        ))
        .unwrap()
    }

    #[test]
    fn test_new_rejects_master_target() {
        let dir = TempDir::new().unwrap();
        let err = SchemaBootstrapper::new(&config_in(&dir, "master")).unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }

    #[test]
    fn test_fresh_server_has_no_catalog() {
        let dir = TempDir::new().unwrap();
        let bootstrapper = SchemaBootstrapper::new(&config_in(&dir, "shop")).unwrap();

        assert!(!bootstrapper.exists().unwrap());
        assert_eq!(bootstrapper.current_version(), "");
        assert!(!bootstrapper.is_current());
        assert!(matches!(
            bootstrapper.try_current_version(),
            Err(CatalogError::Connectivity(_))
        ));
    }

    #[test]
    fn test_create_then_exists_and_is_current() {
        let dir = TempDir::new().unwrap();
        let bootstrapper = SchemaBootstrapper::new(&config_in(&dir, "shop")).unwrap();

        bootstrapper.create().unwrap();

        assert!(bootstrapper.exists().unwrap());
        assert!(bootstrapper.is_current());
        assert_eq!(bootstrapper.current_version(), CURRENT_SCHEMA_VERSION);
        assert_eq!(bootstrapper.repository().count_items().unwrap(), 0);
    }

    #[test]
    fn test_is_current_uses_exact_string_equality() {
        let dir = TempDir::new().unwrap();
        let bootstrapper = SchemaBootstrapper::new(&config_in(&dir, "shop")).unwrap();
        bootstrapper.create().unwrap();

        let conn = bootstrapper.target().open().unwrap();
        conn.execute("UPDATE Version SET [Current] = '1.00'", []).unwrap();

        assert_eq!(bootstrapper.current_version(), "1.00");
        assert!(!bootstrapper.is_current());
    }

    #[test]
    fn test_create_twice_recreates_catalog() {
        let dir = TempDir::new().unwrap();
        let bootstrapper = SchemaBootstrapper::new(&config_in(&dir, "shop")).unwrap();
        bootstrapper.create().unwrap();
        bootstrapper.fill().unwrap();
        assert_eq!(
            bootstrapper.repository().count_items().unwrap(),
            seed::SEED_ITEMS.len()
        );

        bootstrapper.create().unwrap();

        assert!(bootstrapper.exists().unwrap());
        assert!(bootstrapper.is_current());
        assert_eq!(bootstrapper.repository().count_items().unwrap(), 0);
    }

    #[test]
    fn test_catalogs_are_independent() {
        let dir = TempDir::new().unwrap();
        let shop = SchemaBootstrapper::new(&config_in(&dir, "shop")).unwrap();
        let outlet = SchemaBootstrapper::new(&config_in(&dir, "outlet")).unwrap();

        shop.create().unwrap();

        assert!(shop.exists().unwrap());
        assert!(!outlet.exists().unwrap());
    }
}
