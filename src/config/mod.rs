mod file_config;

pub use file_config::FileConfig;

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PROBE_TIMEOUT_SEC: u64 = 10;

const SETTINGS_FILE_NAME: &str = "settings.toml";
const LOCAL_DB_FILE_NAME: &str = "local_catalog.db";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub probe_timeout_sec: u64,
    pub settings_file: Option<PathBuf>,
    pub local_db: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            data_dir: None,
            port: DEFAULT_PORT,
            logging_level: RequestsLoggingLevel::default(),
            probe_timeout_sec: DEFAULT_PROBE_TIMEOUT_SEC,
            settings_file: None,
            local_db: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub probe_timeout_sec: u64,
    pub settings_file: PathBuf,
    pub local_db: PathBuf,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = match file.logging_level {
            Some(s) => match parse_logging_level(&s) {
                Some(level) => level,
                None => bail!("Invalid logging_level in config file: {}", s),
            },
            None => cli.logging_level.clone(),
        };

        let probe_timeout_sec = file.probe_timeout_sec.unwrap_or(cli.probe_timeout_sec);
        if probe_timeout_sec == 0 {
            bail!("probe_timeout_sec must be greater than zero");
        }

        let settings_file = file
            .settings_file
            .map(PathBuf::from)
            .or_else(|| cli.settings_file.clone())
            .unwrap_or_else(|| data_dir.join(SETTINGS_FILE_NAME));

        let local_db = file
            .local_db
            .map(PathBuf::from)
            .or_else(|| cli.local_db.clone())
            .unwrap_or_else(|| data_dir.join(LOCAL_DB_FILE_NAME));

        Ok(Self {
            data_dir,
            port,
            logging_level,
            probe_timeout_sec,
            settings_file,
            local_db,
        })
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_sec)
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
