mod local_store;
mod models;
mod repository;
mod schema;
pub mod seed;
mod trait_def;

pub use local_store::LocalCatalogStore;
pub use models::*;
pub use repository::CatalogRepository;
pub use schema::LOCAL_CATALOG_SCHEMA;
pub use trait_def::CatalogConnector;
