//! Catalog Manager Library
//!
//! Data access for the product catalog: the local embedded store, the Sql
//! server provider and its schema bootstrapping, provider selection, and the
//! REST server exposing the active catalog.

pub mod catalog_store;
pub mod config;
pub mod error;
pub mod providers;
pub mod server;
pub mod sql_provider;
pub mod sqlite_persistence;

pub use catalog_store::{CatalogConnector, CatalogRepository, LocalCatalogStore};
pub use error::{CatalogError, CatalogResult};
pub use providers::{DataProviderKind, ProviderSelector, ValidationOutcome};
pub use server::{run_server, RequestsLoggingLevel};
pub use sql_provider::{ConnectionConfig, SchemaBootstrapper};
