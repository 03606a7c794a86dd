use super::RequestsLoggingLevel;
use crate::providers::DataProviderKind;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Provider backing the served catalog, reported by the home route.
    pub provider: DataProviderKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            provider: DataProviderKind::Local,
        }
    }
}
