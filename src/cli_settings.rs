use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use catalog_manager::catalog_store::{CatalogRepository, ItemFilter, LocalCatalogStore, ANY_ID};
use catalog_manager::config::{AppConfig, CliConfig, FileConfig, DEFAULT_PROBE_TIMEOUT_SEC};
use catalog_manager::providers::{
    DataProviderKind, FileSettingsStore, ProviderSelector, ProviderSettings, ValidationOutcome,
    WebApiClient,
};
use catalog_manager::sql_provider::{ConnectionConfig, SchemaBootstrapper};
use cli_style::{
    get_prompt, get_styles, print_banner, print_command_echo, print_error, print_goodbye,
    print_key_value, print_key_value_highlight, print_section_footer, print_section_header,
    print_success, print_warning, TableBuilder,
};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Directory holding the settings file and the local catalog.
    #[clap(long, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

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

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Shows the saved provider settings and the pending changes.
    Show,

    /// Selects the data provider to use.
    Select { provider: DataProviderKind },

    /// Sets the address of the remote catalog service.
    SetUrl { url: String },

    /// Sets the Sql connection string. Quote it, it contains ';'.
    SetConnection { connection_string: String },

    /// Checks the selected provider without saving anything.
    Validate,

    /// Validates the pending changes and saves them when they are valid.
    Apply,

    /// Drops the pending changes.
    Discard,

    /// Creates the Sql catalog named by the connection string and fills it
    /// with the demo data.
    CreateDb {
        /// Recreate the catalog if it already exists.
        #[clap(long)]
        recreate: bool,
    },

    /// Restores the demo data of the local catalog.
    ResetLocal,

    /// Lists the catalog types of the saved provider.
    Types,

    /// Lists the catalog brands of the saved provider.
    Brands,

    /// Lists the catalog items of the saved provider.
    Items {
        #[arg(long, default_value_t = ANY_ID, allow_negative_numbers = true)]
        type_id: i32,
        #[arg(long, default_value_t = ANY_ID, allow_negative_numbers = true)]
        brand_id: i32,
        #[arg(long)]
        query: Option<String>,
    },

    /// Shows the paths in use.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

struct SettingsSession {
    selector: ProviderSelector,
    config: AppConfig,
    runtime: tokio::runtime::Runtime,
}

impl SettingsSession {
    fn local_store(&self) -> Result<LocalCatalogStore> {
        Ok(LocalCatalogStore::open(&self.config.local_db)?)
    }

    /// Repository of the saved provider, not of the pending changes.
    fn repository(&self) -> Result<CatalogRepository> {
        let persisted = self.selector.persisted();
        match persisted.provider {
            DataProviderKind::Local => Ok(self.local_store()?.repository()),
            DataProviderKind::Sql => {
                let config = ConnectionConfig::parse(&persisted.sql_connection_string)?;
                Ok(SchemaBootstrapper::new(&config)?.repository())
            }
            DataProviderKind::Rest => {
                bail!("Browsing is only available for the local and sql providers")
            }
        }
    }
}

fn print_outcome(outcome: &ValidationOutcome) {
    match outcome {
        ValidationOutcome::Ok(None) => print_success("Ok"),
        ValidationOutcome::Ok(Some(notice)) => print_success(&notice.to_string()),
        ValidationOutcome::Error(notice) => print_error(&notice.to_string()),
    }
}

fn print_setting(key: &str, saved: &str, pending: &str) {
    if saved == pending {
        print_key_value(key, saved);
    } else {
        print_key_value_highlight(key, &format!("{} (saved: {})", pending, saved));
    }
}

fn show_settings(persisted: &ProviderSettings, candidate: &ProviderSettings) {
    print_section_header("Data provider");
    print_setting(
        "Provider",
        persisted.provider.as_str(),
        candidate.provider.as_str(),
    );
    print_setting("Service url", &persisted.service_url, &candidate.service_url);
    print_setting(
        "Connection string",
        &persisted.sql_connection_string,
        &candidate.sql_connection_string,
    );
    print_section_footer();
}

fn execute_command(line: String, session: &mut SettingsSession) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            print_command_echo(&line);
            match cli.command {
                InnerCommand::Show => {
                    show_settings(session.selector.persisted(), session.selector.candidate());
                    if session.selector.has_changes() {
                        print_warning("There are unsaved changes, run 'apply' to save them.");
                    }
                }
                InnerCommand::Select { provider } => session.selector.select(provider),
                InnerCommand::SetUrl { url } => session.selector.set_service_url(&url),
                InnerCommand::SetConnection { connection_string } => {
                    session.selector.set_sql_connection_string(&connection_string)
                }
                InnerCommand::Validate => {
                    let outcome = session.runtime.block_on(session.selector.validate());
                    print_outcome(&outcome);
                }
                InnerCommand::Apply => {
                    let outcome = session.runtime.block_on(session.selector.apply_changes());
                    print_outcome(&outcome);
                }
                InnerCommand::Discard => session.selector.discard_changes(),
                InnerCommand::CreateDb { recreate } => {
                    let outcome = session
                        .runtime
                        .block_on(session.selector.create_database(recreate));
                    print_outcome(&outcome);
                    if outcome.title() == Some("Canceled") {
                        print_warning("The database already exists, use --recreate to replace it.");
                    }
                }
                InnerCommand::ResetLocal => {
                    let store = match session.local_store() {
                        Ok(store) => store,
                        Err(err) => return CommandExecutionResult::Error(format!("{:#}", err)),
                    };
                    let outcome = session
                        .runtime
                        .block_on(session.selector.reset_local_data(&store));
                    print_outcome(&outcome);
                }
                InnerCommand::Types => {
                    let types = match session.repository().and_then(|r| Ok(r.get_types()?)) {
                        Ok(types) => types,
                        Err(err) => return CommandExecutionResult::Error(format!("{:#}", err)),
                    };
                    let mut table = TableBuilder::new(vec!["Id", "Type"]);
                    for t in types {
                        table.add_row(vec![t.id.to_string(), t.name]);
                    }
                    table.print();
                }
                InnerCommand::Brands => {
                    let brands = match session.repository().and_then(|r| Ok(r.get_brands()?)) {
                        Ok(brands) => brands,
                        Err(err) => return CommandExecutionResult::Error(format!("{:#}", err)),
                    };
                    let mut table = TableBuilder::new(vec!["Id", "Brand"]);
                    for b in brands {
                        table.add_row(vec![b.id.to_string(), b.name]);
                    }
                    table.print();
                }
                InnerCommand::Items {
                    type_id,
                    brand_id,
                    query,
                } => {
                    let filter = ItemFilter::new(type_id, brand_id, query.as_deref());
                    let items = match session
                        .repository()
                        .and_then(|r| Ok(r.get_items_filtered(&filter)?))
                    {
                        Ok(items) => items,
                        Err(err) => return CommandExecutionResult::Error(format!("{:#}", err)),
                    };
                    let mut table =
                        TableBuilder::new(vec!["Id", "Name", "Price", "Type", "Brand"]);
                    for item in items {
                        table.add_row(vec![
                            item.id.to_string(),
                            item.name,
                            format!("{:.2}", item.price),
                            item.type_id.to_string(),
                            item.brand_id.to_string(),
                        ]);
                    }
                    table.print();
                }
                InnerCommand::Where => {
                    print_key_value("Settings", &session.config.settings_file.display().to_string());
                    print_key_value("Local catalog", &session.config.local_db.display().to_string());
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct CommandHelper {
    commands_names: Vec<String>,
}

impl CommandHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandHelper { commands_names }
    }
}

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandHelper {}
impl Validator for CommandHelper {}
impl Helper for CommandHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        data_dir: cli_args.data_dir.clone(),
        probe_timeout_sec: cli_args.probe_timeout_sec,
        settings_file: cli_args.settings_file.clone(),
        local_db: cli_args.local_db.clone(),
        ..Default::default()
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let store = Arc::new(FileSettingsStore::new(&config.settings_file));
    let probe = Arc::new(WebApiClient::new(config.probe_timeout())?);
    let selector = ProviderSelector::load(store, probe)
        .with_context(|| format!("Could not load settings from {:?}", config.settings_file))?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    print_banner(&config.settings_file.display().to_string());
    let mut session = SettingsSession {
        selector,
        config,
        runtime,
    };

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<CommandHelper, FileHistory>::with_config(rl_config)?;
    rl.set_helper(Some(CommandHelper::new()));

    let prompt = get_prompt();
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line.trim().to_string(), &mut session) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => {
                        print_error(&err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }

    if session.selector.has_changes() {
        print_warning("Unsaved changes were discarded.");
    }
    print_goodbye();
    Ok(())
}
