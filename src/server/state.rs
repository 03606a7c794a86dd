use axum::extract::FromRef;

use crate::catalog_store::CatalogRepository;
use std::time::Instant;

use super::ServerConfig;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub repository: CatalogRepository,
    pub hash: String,
}

impl FromRef<ServerState> for CatalogRepository {
    fn from_ref(input: &ServerState) -> Self {
        input.repository.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
