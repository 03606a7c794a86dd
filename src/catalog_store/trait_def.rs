//! CatalogConnector trait definition.

use crate::error::CatalogResult;
use rusqlite::Connection;

/// Source of connections to a database holding the catalog tables.
///
/// Implemented by the Sql provider (a connection string into a server
/// directory) and by the Local embedded store. Every call returns a fresh
/// connection; dropping it releases it.
pub trait CatalogConnector: Send + Sync {
    fn connect(&self) -> CatalogResult<Connection>;

    /// Human readable target description, safe to log.
    fn describe(&self) -> String;
}
