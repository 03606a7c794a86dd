//! Connection string handling for the Sql provider.
//!
//! Connection strings use the ADO style `Key=Value;Key=Value` syntax. The
//! data source is a server directory: the administrative database lives in
//! `<dir>/master.db` and registers the catalogs stored as `<dir>/<name>.db`.

use crate::catalog_store::CatalogConnector;
use crate::error::{CatalogError, CatalogResult};
use crate::server::metrics::record_db_connection_error;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Name of the administrative database.
pub const MASTER_CATALOG: &str = "master";

/// Names a user catalog cannot take: the administrative database and the
/// schemas SQLite reserves on every connection.
const RESERVED_CATALOGS: &[&str] = &[MASTER_CATALOG, "main", "temp"];

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

const DATA_SOURCE_KEYS: &[&str] = &["data source", "server", "address"];
const CATALOG_KEYS: &[&str] = &["initial catalog", "database"];
const TIMEOUT_KEYS: &[&str] = &["connect timeout", "connection timeout"];
const READ_ONLY_KEYS: &[&str] = &["read only"];
const SECRET_KEYS: &[&str] = &["password", "pwd"];

const MASTER_REGISTRY_DDL: &str = "CREATE TABLE IF NOT EXISTS sys_databases (\
    name TEXT PRIMARY KEY, \
    file TEXT NOT NULL, \
    created_at INTEGER)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Key/value pairs with the keys spelled as given, in the original order.
    entries: Vec<(String, String)>,
    /// The catalog this configuration is about, kept when the connection is
    /// redirected to the administrative database.
    target_catalog: Option<String>,
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn invalid_segment(segment: &str) -> CatalogError {
    CatalogError::Config(format!("Invalid connection string segment '{}'", segment))
}

/// Splits a connection string into raw key/value pairs.
///
/// A value is quoted only when `'` or `"` is its first non-blank character;
/// inside it the quote character is escaped by doubling it. Quote characters
/// anywhere else are plain text.
fn split_pairs(s: &str) -> CatalogResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        let mut key = String::new();
        let mut has_value = false;
        while let Some(c) = chars.next() {
            match c {
                '=' => {
                    has_value = true;
                    break;
                }
                ';' => break,
                _ => key.push(c),
            }
        }
        if !has_value {
            if !key.trim().is_empty() {
                return Err(invalid_segment(key.trim()));
            }
            if chars.peek().is_none() {
                break;
            }
            continue;
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let value = match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => {
                            return Err(CatalogError::Config(
                                "Unterminated quoted value in connection string".to_string(),
                            ))
                        }
                        Some(c) if c == quote => {
                            if chars.next_if_eq(&quote).is_some() {
                                value.push(quote);
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                    }
                }
                while chars.next_if(|c| c.is_whitespace()).is_some() {}
                match chars.next() {
                    None | Some(';') => {}
                    Some(_) => return Err(invalid_segment(&format!("{}={}", key.trim(), value))),
                }
                value
            }
            _ => {
                let mut value = String::new();
                while let Some(c) = chars.next_if(|c| *c != ';') {
                    value.push(c);
                }
                chars.next();
                value.trim().to_string()
            }
        };
        pairs.push((key.trim().to_string(), value));
    }
    Ok(pairs)
}

fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.contains(';')
        || value.trim() != value
        || value.starts_with(['"', '\'']);
    if !needs_quotes {
        return value.to_string();
    }
    let quote = if value.contains('"') && !value.contains('\'') {
        '\''
    } else {
        '"'
    };
    let doubled = format!("{}{}", quote, quote);
    format!("{}{}{}", quote, value.replace(quote, &doubled), quote)
}

/// Checks that `name` can be used as a user catalog.
pub fn validate_catalog_name(name: &str) -> CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::Config("Initial Catalog is missing.".to_string()));
    }
    if RESERVED_CATALOGS
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        return Err(CatalogError::Config(format!(
            "Invalid Initial Catalog '{}'.",
            name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CatalogError::Config(format!(
            "Invalid Initial Catalog '{}': only letters, digits, '_' and '-' are allowed.",
            name
        )));
    }
    Ok(())
}

impl ConnectionConfig {
    pub fn parse(s: &str) -> CatalogResult<Self> {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (key, value) in split_pairs(s)? {
            if key.is_empty() {
                return Err(CatalogError::Config(format!(
                    "Missing key in connection string segment '={}'",
                    value
                )));
            }

            // Last occurrence wins, like ADO.
            let normalized = normalize_key(&key);
            entries.retain(|(k, _)| normalize_key(k) != normalized);
            entries.push((key, value));
        }

        let mut config = ConnectionConfig {
            entries,
            target_catalog: None,
        };
        config.target_catalog = config.initial_catalog().map(str::to_string);
        Ok(config)
    }

    fn value_of(&self, keys: &[&str]) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| keys.contains(&normalize_key(k).as_str()))
            .map(|(_, v)| v.as_str())
    }

    fn set_value(&mut self, keys: &[&str], default_key: &str, value: &str) {
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| keys.contains(&normalize_key(k).as_str()))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((default_key.to_string(), value.to_string())),
        }
    }

    pub fn data_source(&self) -> Option<&str> {
        self.value_of(DATA_SOURCE_KEYS).filter(|s| !s.is_empty())
    }

    /// The catalog the connection currently points at.
    pub fn initial_catalog(&self) -> Option<&str> {
        self.value_of(CATALOG_KEYS)
    }

    /// The user catalog this configuration targets, validated.
    pub fn target_catalog(&self) -> CatalogResult<&str> {
        let name = self.target_catalog.as_deref().unwrap_or_default();
        validate_catalog_name(name)?;
        Ok(name)
    }

    pub fn is_master(&self) -> bool {
        self.initial_catalog()
            .map(|c| c.eq_ignore_ascii_case(MASTER_CATALOG))
            .unwrap_or(false)
    }

    pub fn connect_timeout(&self) -> CatalogResult<Duration> {
        match self.value_of(TIMEOUT_KEYS) {
            None => Ok(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            Some(value) => value.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                CatalogError::Config(format!("Invalid Connect Timeout '{}'", value))
            }),
        }
    }

    pub fn read_only(&self) -> CatalogResult<bool> {
        match self.value_of(READ_ONLY_KEYS) {
            None => Ok(false),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(true),
                "false" | "no" => Ok(false),
                _ => Err(CatalogError::Config(format!("Invalid Read Only '{}'", value))),
            },
        }
    }

    /// A copy pointed at the administrative database, every other parameter
    /// preserved. Idempotent: the target catalog survives the redirect.
    pub fn with_master_catalog(&self) -> CatalogResult<Self> {
        let target = self.target_catalog()?.to_string();
        let mut copy = self.clone();
        copy.set_value(CATALOG_KEYS, "Initial Catalog", MASTER_CATALOG);
        copy.target_catalog = Some(target);
        Ok(copy)
    }

    /// A copy pointed back at the target catalog.
    pub fn with_target_catalog(&self) -> CatalogResult<Self> {
        let target = self.target_catalog()?.to_string();
        let mut copy = self.clone();
        copy.set_value(CATALOG_KEYS, "Initial Catalog", &target);
        Ok(copy)
    }

    fn server_dir(&self) -> CatalogResult<&Path> {
        let data_source = self
            .data_source()
            .ok_or_else(|| CatalogError::Config("Data Source is missing.".to_string()))?;
        Ok(Path::new(data_source))
    }

    /// File backing the catalog the connection currently points at.
    pub fn database_path(&self) -> CatalogResult<PathBuf> {
        let catalog = self
            .initial_catalog()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CatalogError::Config("Initial Catalog is missing.".to_string()))?;
        if !self.is_master() {
            validate_catalog_name(catalog)?;
        }
        Ok(self.server_dir()?.join(format!("{}.db", catalog)))
    }

    /// File backing the target catalog, whatever the connection points at.
    pub fn target_database_path(&self) -> CatalogResult<PathBuf> {
        let target = self.target_catalog()?;
        Ok(self.server_dir()?.join(format!("{}.db", target)))
    }

    /// Opens a fresh connection.
    ///
    /// The administrative database is created on demand. A user catalog must
    /// already exist: opening a missing one is a connectivity error.
    pub fn open(&self) -> CatalogResult<Connection> {
        let server_dir = self.server_dir()?;
        if !server_dir.is_dir() {
            record_db_connection_error();
            return Err(CatalogError::Connectivity(format!(
                "Data Source {:?} is not reachable",
                server_dir
            )));
        }
        let path = self.database_path()?;
        let is_master = self.is_master();

        // Read Only applies to user catalogs, master stays writable.
        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if is_master {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        } else if self.read_only()? {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
        }

        let conn = Connection::open_with_flags(&path, flags).map_err(|e| {
            record_db_connection_error();
            CatalogError::Connectivity(format!(
                "Cannot open database \"{}\" requested by the login: {}",
                self.initial_catalog().unwrap_or_default(),
                e
            ))
        })?;
        conn.busy_timeout(self.connect_timeout()?)?;
        if is_master {
            conn.execute_batch(MASTER_REGISTRY_DDL)?;
        }
        Ok(conn)
    }

    /// Connection string with secrets masked, for logs.
    pub fn redacted(&self) -> String {
        self.render(true)
    }

    fn render(&self, redact: bool) -> String {
        self.entries
            .iter()
            .map(|(k, v)| {
                if redact && SECRET_KEYS.contains(&normalize_key(k).as_str()) {
                    format!("{}=***", k)
                } else {
                    format!("{}={}", k, quote_if_needed(v))
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl FromStr for ConnectionConfig {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionConfig::parse(s)
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl CatalogConnector for ConnectionConfig {
    fn connect(&self) -> CatalogResult<Connection> {
        self.open()
    }

    fn describe(&self) -> String {
        format!("sql catalog [{}]", self.redacted())
    }
}
