mod bootstrap;
mod connection;
mod script;

pub use bootstrap::{SchemaBootstrapper, CURRENT_SCHEMA_VERSION};
pub use connection::{validate_catalog_name, ConnectionConfig, MASTER_CATALOG};
pub use script::{split_batches, CREATE_DB_SCRIPT};
