//! Error taxonomy shared by the data-access layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Bad connection parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store or the remote service cannot be reached.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Missing or mismatched schema, or a failing DDL batch.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Rejected user input.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Config(_) => "config",
            CatalogError::Connectivity(_) => "connectivity",
            CatalogError::Schema(_) => "schema",
            CatalogError::Validation(_) => "validation",
            CatalogError::Storage(_) => "storage",
            CatalogError::Io(_) => "io",
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
