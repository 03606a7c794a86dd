//! Persisted provider settings.

use super::kind::DataProviderKind;
use crate::error::{CatalogError, CatalogResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub const DATA_PROVIDER_KEY: &str = "data_provider";
pub const SERVICE_URL_KEY: &str = "service_url";
pub const SQL_CONNECTION_STRING_KEY: &str = "sql_connection_string";

/// String key/value storage for application settings.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> CatalogResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CatalogResult<()>;
}

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get(&self, key: &str) -> CatalogResult<Option<String>> {
        let values = self.values.lock().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CatalogResult<()> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings kept in a flat TOML table. Every write rewrites the file.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileSettingsStore {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> CatalogResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            CatalogError::Config(format!(
                "Failed to parse settings file {:?}: {}",
                self.path, e
            ))
        })
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> CatalogResult<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> CatalogResult<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let content = toml::to_string(&values).map_err(|e| {
            CatalogError::Config(format!("Failed to serialize settings: {}", e))
        })?;
        std::fs::write(&self.path, content)?;
        debug!("Saved setting {} to {:?}", key, self.path);
        Ok(())
    }
}

fn poisoned() -> CatalogError {
    CatalogError::Config("Settings store lock poisoned".to_string())
}

/// The provider configuration as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderSettings {
    pub provider: DataProviderKind,
    pub service_url: String,
    pub sql_connection_string: String,
}

impl ProviderSettings {
    /// Missing keys fall back to their defaults, an unknown provider name is
    /// a validation error.
    pub fn load(store: &dyn SettingsStore) -> CatalogResult<Self> {
        let provider = match store.get(DATA_PROVIDER_KEY)? {
            Some(value) => value.parse()?,
            None => DataProviderKind::default(),
        };
        Ok(ProviderSettings {
            provider,
            service_url: store.get(SERVICE_URL_KEY)?.unwrap_or_default(),
            sql_connection_string: store.get(SQL_CONNECTION_STRING_KEY)?.unwrap_or_default(),
        })
    }

    /// Writes the provider and the parameters it uses. The parameters of the
    /// other providers are left untouched.
    pub fn save(&self, store: &dyn SettingsStore) -> CatalogResult<()> {
        store.set(DATA_PROVIDER_KEY, self.provider.as_str())?;
        match self.provider {
            DataProviderKind::Local => {}
            DataProviderKind::Rest => store.set(SERVICE_URL_KEY, &self.service_url)?,
            DataProviderKind::Sql => {
                store.set(SQL_CONNECTION_STRING_KEY, &self.sql_connection_string)?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_from_empty_store() {
        let store = InMemorySettingsStore::new();
        assert_eq!(
            ProviderSettings::load(&store).unwrap(),
            ProviderSettings::default()
        );
    }

    #[test]
    fn test_load_rejects_unknown_provider() {
        let store = InMemorySettingsStore::new();
        store.set(DATA_PROVIDER_KEY, "oracle").unwrap();
        let err = ProviderSettings::load(&store).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn test_save_only_writes_active_parameters() {
        let store = InMemorySettingsStore::new();
        store.set(SERVICE_URL_KEY, "http://old").unwrap();
        let settings = ProviderSettings {
            provider: DataProviderKind::Sql,
            service_url: "http://ignored".to_string(),
            sql_connection_string: "Data Source=/srv;Initial Catalog=shop".to_string(),
        };

        settings.save(&store).unwrap();

        assert_eq!(store.get(DATA_PROVIDER_KEY).unwrap().as_deref(), Some("sql"));
        assert_eq!(store.get(SERVICE_URL_KEY).unwrap().as_deref(), Some("http://old"));
        assert_eq!(
            store.get(SQL_CONNECTION_STRING_KEY).unwrap().as_deref(),
            Some("Data Source=/srv;Initial Catalog=shop")
        );
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        let store = FileSettingsStore::new(&path);
        assert_eq!(store.get(DATA_PROVIDER_KEY).unwrap(), None);
        store.set(DATA_PROVIDER_KEY, "rest").unwrap();
        store.set(SERVICE_URL_KEY, "http://localhost:3001/").unwrap();

        let reopened = FileSettingsStore::new(&path);
        let settings = ProviderSettings::load(&reopened).unwrap();
        assert_eq!(settings.provider, DataProviderKind::Rest);
        assert_eq!(settings.service_url, "http://localhost:3001/");
    }

    #[test]
    fn test_file_store_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "data_provider = [unclosed").unwrap();

        let err = FileSettingsStore::new(&path).get(DATA_PROVIDER_KEY).unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }
}
