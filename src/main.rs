use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_manager::catalog_store::{CatalogRepository, LocalCatalogStore};
use catalog_manager::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_PORT, DEFAULT_PROBE_TIMEOUT_SEC,
};
use catalog_manager::providers::{DataProviderKind, FileSettingsStore, ProviderSettings};
use catalog_manager::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use catalog_manager::sql_provider::{ConnectionConfig, SchemaBootstrapper, CURRENT_SCHEMA_VERSION};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the settings file and the local catalog.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Timeout in seconds when probing a remote catalog service.
    #[clap(long, default_value_t = DEFAULT_PROBE_TIMEOUT_SEC)]
    pub probe_timeout_sec: u64,

    /// Settings file, defaults to <data-dir>/settings.toml.
    #[clap(long, value_parser = parse_path)]
    pub settings_file: Option<PathBuf>,

    /// Local catalog database, defaults to <data-dir>/local_catalog.db.
    #[clap(long, value_parser = parse_path)]
    pub local_db: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            data_dir: self.data_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            probe_timeout_sec: self.probe_timeout_sec,
            settings_file: self.settings_file.clone(),
            local_db: self.local_db.clone(),
        }
    }
}

fn open_sql_repository(connection_string: &str) -> Result<CatalogRepository> {
    let config = ConnectionConfig::parse(connection_string)?;
    let bootstrapper = SchemaBootstrapper::new(&config)?;
    if !bootstrapper.exists()? {
        bail!(
            "Catalog {} not found, create it with cli-settings first",
            bootstrapper.catalog_name()?
        );
    }
    if !bootstrapper.is_current() {
        bail!(
            "Catalog {} has schema version '{}', expected '{}'",
            bootstrapper.catalog_name()?,
            bootstrapper.current_version(),
            CURRENT_SCHEMA_VERSION
        );
    }
    Ok(bootstrapper.repository())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Loading provider settings from {:?}...", app_config.settings_file);
    let settings_store = FileSettingsStore::new(&app_config.settings_file);
    let settings = ProviderSettings::load(&settings_store)?;
    info!("Active data provider: {}", settings.provider);

    let repository = match settings.provider {
        DataProviderKind::Local => {
            info!("Opening local catalog at {:?}...", app_config.local_db);
            LocalCatalogStore::open(&app_config.local_db)?.repository()
        }
        DataProviderKind::Sql => open_sql_repository(&settings.sql_connection_string)?,
        DataProviderKind::Rest => bail!(
            "The catalog is served by {}, select the local or sql provider to serve it from here",
            settings.service_url
        ),
    };

    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::set_catalog_counts(
        repository.count_types()?,
        repository.count_brands()?,
        repository.count_items()?,
    );

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        provider: settings.provider,
    };

    info!("Ready to serve at port {}!", app_config.port);
    run_server(server_config, repository).await
}
