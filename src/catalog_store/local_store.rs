//! Local embedded catalog store.
//!
//! A single SQLite file owned by the application. It is created and seeded
//! on first open, validated against [`LOCAL_CATALOG_SCHEMA`] afterwards, and
//! can be reset to the seed data at any time.

use super::repository::CatalogRepository;
use super::schema::{CATALOG_TABLE_NAMES, LOCAL_CATALOG_SCHEMA};
use super::seed;
use super::trait_def::CatalogConnector;
use crate::error::{CatalogError, CatalogResult};
use crate::sqlite_persistence::stored_version;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LocalCatalogStore {
    db_path: PathBuf,
}

impl LocalCatalogStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> CatalogResult<Self> {
        let store = LocalCatalogStore {
            db_path: db_path.as_ref().to_path_buf(),
        };

        let conn = Connection::open_with_flags(
            &store.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            CatalogError::Connectivity(format!(
                "Failed to open local catalog {:?}: {}",
                store.db_path, e
            ))
        })?;

        match stored_version(&conn)? {
            None => {
                info!(
                    "Creating local catalog at {:?} with schema version {}",
                    store.db_path, LOCAL_CATALOG_SCHEMA.version
                );
                LOCAL_CATALOG_SCHEMA.create(&conn)?;
                conn.pragma_update(None, "journal_mode", "WAL")?;
                drop(conn);
                seed::fill(&store.repository())?;
            }
            Some(_) => {
                LOCAL_CATALOG_SCHEMA.validate(&conn)?;
                info!("Opened local catalog at {:?}", store.db_path);
            }
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn repository(&self) -> CatalogRepository {
        CatalogRepository::new(Arc::new(self.clone()))
    }

    /// Removes every catalog row and restores the seed data.
    pub fn reset_data(&self) -> CatalogResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        for table in CATALOG_TABLE_NAMES {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
        tx.commit()?;
        drop(conn);

        seed::fill(&self.repository())?;
        info!("Local catalog {:?} restored to default data", self.db_path);
        Ok(())
    }
}

impl CatalogConnector for LocalCatalogStore {
    fn connect(&self) -> CatalogResult<Connection> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            crate::server::metrics::record_db_connection_error();
            CatalogError::Connectivity(format!(
                "Failed to open local catalog {:?}: {}",
                self.db_path, e
            ))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn describe(&self) -> String {
        format!("local catalog {}", self.db_path.display())
    }
}
