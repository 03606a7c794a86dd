//! Choosing, validating and committing the active data provider.

use super::kind::DataProviderKind;
use super::probe::ServiceProbe;
use super::settings::{ProviderSettings, SettingsStore};
use crate::catalog_store::LocalCatalogStore;
use crate::error::CatalogResult;
use crate::server::metrics::record_provider_validation;
use crate::sql_provider::{ConnectionConfig, SchemaBootstrapper};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

const ENTER_SERVICE_URL: &str = "Please, enter a valid service url.";
const ENTER_CONNECTION_STRING: &str = "Please, enter a valid connection string.";
const SQL_CONNECTION_FAILED: &str = "Error connecting to Sql Server";

/// A user facing message: a short title and a longer explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub detail: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Notice {
            title: title.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok(Option<Notice>),
    Error(Notice),
}

impl ValidationOutcome {
    fn success(detail: &str) -> Self {
        ValidationOutcome::Ok(Some(Notice::new("Success", detail)))
    }

    fn error(title: &str, detail: impl Into<String>) -> Self {
        ValidationOutcome::Error(Notice::new(title, detail))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok(_))
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            ValidationOutcome::Ok(notice) => notice.as_ref(),
            ValidationOutcome::Error(notice) => Some(notice),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.notice().map(|n| n.title.as_str())
    }
}

/// Holds a candidate provider configuration next to the persisted one.
///
/// The candidate is only written back to the settings store by
/// [`ProviderSelector::apply_changes`], after it validated successfully.
/// Every change to the candidate is published on a watch channel.
pub struct ProviderSelector {
    store: Arc<dyn SettingsStore>,
    probe: Arc<dyn ServiceProbe>,
    persisted: ProviderSettings,
    candidate: ProviderSettings,
    changes: watch::Sender<ProviderSettings>,
}

impl ProviderSelector {
    pub fn load(store: Arc<dyn SettingsStore>, probe: Arc<dyn ServiceProbe>) -> CatalogResult<Self> {
        let persisted = ProviderSettings::load(store.as_ref())?;
        let (changes, _) = watch::channel(persisted.clone());
        Ok(ProviderSelector {
            store,
            probe,
            candidate: persisted.clone(),
            persisted,
            changes,
        })
    }

    pub fn candidate(&self) -> &ProviderSettings {
        &self.candidate
    }

    pub fn persisted(&self) -> &ProviderSettings {
        &self.persisted
    }

    pub fn has_changes(&self) -> bool {
        self.candidate != self.persisted
    }

    /// Receives the candidate every time it changes.
    pub fn subscribe(&self) -> watch::Receiver<ProviderSettings> {
        self.changes.subscribe()
    }

    pub fn select(&mut self, kind: DataProviderKind) {
        self.update(|c| c.provider = kind);
    }

    pub fn set_service_url(&mut self, url: &str) {
        self.update(|c| c.service_url = url.trim().to_string());
    }

    pub fn set_sql_connection_string(&mut self, connection_string: &str) {
        self.update(|c| c.sql_connection_string = connection_string.trim().to_string());
    }

    /// Drops the candidate changes.
    pub fn discard_changes(&mut self) {
        let persisted = self.persisted.clone();
        self.update(|c| *c = persisted);
    }

    fn update(&mut self, f: impl FnOnce(&mut ProviderSettings)) {
        let before = self.candidate.clone();
        f(&mut self.candidate);
        if self.candidate != before {
            self.changes.send_replace(self.candidate.clone());
        }
    }

    /// Checks that the candidate provider is usable. Never fails: problems
    /// are reported as an error notice.
    pub async fn validate(&self) -> ValidationOutcome {
        let outcome = match self.candidate.provider {
            DataProviderKind::Local => ValidationOutcome::Ok(None),
            DataProviderKind::Rest => self.validate_rest().await,
            DataProviderKind::Sql => self.validate_sql().await,
        };
        record_provider_validation(
            self.candidate.provider.as_str(),
            if outcome.is_ok() { "ok" } else { "error" },
        );
        outcome
    }

    async fn validate_rest(&self) -> ValidationOutcome {
        let url = self.candidate.service_url.as_str();
        if url.is_empty() {
            return ValidationOutcome::error("Empty address", ENTER_SERVICE_URL);
        }
        if !is_absolute_http_url(url) {
            return ValidationOutcome::error("Bad address", ENTER_SERVICE_URL);
        }

        match self.probe.probe(url).await {
            Ok(()) => ValidationOutcome::success("The connection to the server succeeded."),
            Err(err) => {
                warn!("Remote catalog service {} is not reachable: {:#}", url, err);
                ValidationOutcome::error("Error accessing remote service", format!("{:#}", err))
            }
        }
    }

    async fn validate_sql(&self) -> ValidationOutcome {
        let bootstrapper = match self.sql_bootstrapper() {
            Ok(bootstrapper) => bootstrapper,
            Err(outcome) => return outcome,
        };
        run_blocking(move || check_sql_catalog(&bootstrapper)).await
    }

    fn sql_bootstrapper(&self) -> Result<SchemaBootstrapper, ValidationOutcome> {
        let connection_string = self.candidate.sql_connection_string.as_str();
        if connection_string.is_empty() {
            return Err(ValidationOutcome::error(
                "Empty connection string",
                ENTER_CONNECTION_STRING,
            ));
        }
        ConnectionConfig::parse(connection_string)
            .and_then(|config| SchemaBootstrapper::new(&config))
            .map_err(|err| {
                warn!("Rejected connection string: {}", err);
                ValidationOutcome::error("Bad connection string", ENTER_CONNECTION_STRING)
            })
    }

    /// Validates the candidate and, only when it is usable, persists it.
    pub async fn apply_changes(&mut self) -> ValidationOutcome {
        let outcome = self.validate().await;
        if !outcome.is_ok() {
            return outcome;
        }

        if let Err(err) = self.candidate.save(self.store.as_ref()) {
            warn!("Failed to save provider settings: {}", err);
            return ValidationOutcome::error("Error saving settings", err.to_string());
        }
        // Only the active provider's parameters were written, reread the rest.
        self.persisted = match ProviderSettings::load(self.store.as_ref()) {
            Ok(persisted) => persisted,
            Err(err) => {
                warn!("Failed to reload provider settings: {}", err);
                return ValidationOutcome::error("Error saving settings", err.to_string());
            }
        };
        info!("Data provider set to {}", self.persisted.provider);
        outcome
    }

    /// Creates the candidate Sql catalog and fills it with the demo data.
    ///
    /// An existing catalog is only recreated when `recreate` is set.
    pub async fn create_database(&self, recreate: bool) -> ValidationOutcome {
        let bootstrapper = match self.sql_bootstrapper() {
            Ok(bootstrapper) => bootstrapper,
            Err(outcome) => return outcome,
        };
        run_blocking(move || {
            let exists = match bootstrapper.exists() {
                Ok(exists) => exists,
                Err(err) => return ValidationOutcome::error(SQL_CONNECTION_FAILED, err.to_string()),
            };
            if exists && !recreate {
                return ValidationOutcome::Ok(Some(Notice::new(
                    "Canceled",
                    "Create database canceled",
                )));
            }
            match bootstrapper.create().and_then(|_| bootstrapper.fill()) {
                Ok(()) => ValidationOutcome::success("Database created successfully."),
                Err(err) => {
                    warn!("Failed to create catalog: {}", err);
                    ValidationOutcome::error("Error creating database", err.to_string())
                }
            }
        })
        .await
    }

    /// Restores the demo data of the Local provider.
    pub async fn reset_local_data(&self, store: &LocalCatalogStore) -> ValidationOutcome {
        let store = store.clone();
        run_blocking(move || match store.reset_data() {
            Ok(()) => ValidationOutcome::success("Local provider restored to default data."),
            Err(err) => ValidationOutcome::error("Error resetting local data", err.to_string()),
        })
        .await
    }
}

fn is_absolute_http_url(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

fn check_sql_catalog(bootstrapper: &SchemaBootstrapper) -> ValidationOutcome {
    match bootstrapper.exists() {
        Err(err) => ValidationOutcome::error(SQL_CONNECTION_FAILED, err.to_string()),
        Ok(false) => ValidationOutcome::error(
            "Database not found",
            "Database not found using current connection string. Please, create the database and try again.",
        ),
        Ok(true) if !bootstrapper.is_current() => ValidationOutcome::error(
            "Version mismatch",
            "Database version mismatch. Please, create the database and try again.",
        ),
        Ok(true) => ValidationOutcome::success("The connection to the Sql Server succeeded."),
    }
}

async fn run_blocking<F>(f: F) -> ValidationOutcome
where
    F: FnOnce() -> ValidationOutcome + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(outcome) => outcome,
        Err(err) => ValidationOutcome::error("Internal error", err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::settings::{
        InMemorySettingsStore, DATA_PROVIDER_KEY, SQL_CONNECTION_STRING_KEY,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeProbe {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ServiceProbe for FakeProbe {
        async fn probe(&self, _base_url: &str) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused")
            }
            Ok(())
        }
    }

    fn selector_with(probe: Arc<FakeProbe>) -> (ProviderSelector, Arc<InMemorySettingsStore>) {
        let store = Arc::new(InMemorySettingsStore::new());
        let selector = ProviderSelector::load(store.clone(), probe).unwrap();
        (selector, store)
    }

    fn sql_string(dir: &TempDir, catalog: &str) -> String {
        format!(
            "Data Source={};Initial Catalog={}",
            dir.path().display(),
            catalog
        )
    }

    #[tokio::test]
    async fn test_local_validates_without_notice() {
        let (selector, _) = selector_with(Arc::new(FakeProbe::default()));
        assert_eq!(selector.validate().await, ValidationOutcome::Ok(None));
    }

    #[tokio::test]
    async fn test_rest_address_checks_skip_probe() {
        let probe = Arc::new(FakeProbe::default());
        let (mut selector, _) = selector_with(probe.clone());
        selector.select(DataProviderKind::Rest);

        assert_eq!(selector.validate().await.title(), Some("Empty address"));

        for bad in ["not a url", "/relative/path", "ftp://host/catalog", "http//missing"] {
            selector.set_service_url(bad);
            assert_eq!(selector.validate().await.title(), Some("Bad address"), "{}", bad);
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rest_probe_outcomes() {
        let (mut selector, _) = selector_with(Arc::new(FakeProbe::default()));
        selector.select(DataProviderKind::Rest);
        selector.set_service_url("http://localhost:3001/");
        let outcome = selector.validate().await;
        assert!(outcome.is_ok());
        assert_eq!(
            outcome.notice().unwrap().detail,
            "The connection to the server succeeded."
        );

        let failing = Arc::new(FakeProbe {
            fail: true,
            ..Default::default()
        });
        let (mut selector, _) = selector_with(failing);
        selector.select(DataProviderKind::Rest);
        selector.set_service_url("http://localhost:3001/");
        let outcome = selector.validate().await;
        assert_eq!(outcome.title(), Some("Error accessing remote service"));
        assert!(outcome.notice().unwrap().detail.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_sql_validation_steps() {
        let dir = TempDir::new().unwrap();
        let (mut selector, _) = selector_with(Arc::new(FakeProbe::default()));
        selector.select(DataProviderKind::Sql);

        assert_eq!(selector.validate().await.title(), Some("Empty connection string"));

        selector.set_sql_connection_string("Data Source");
        assert_eq!(selector.validate().await.title(), Some("Bad connection string"));

        selector.set_sql_connection_string(&sql_string(&dir, "master"));
        assert_eq!(selector.validate().await.title(), Some("Bad connection string"));

        selector.set_sql_connection_string("Data Source=/no/such/server;Initial Catalog=shop");
        assert_eq!(selector.validate().await.title(), Some(SQL_CONNECTION_FAILED));

        selector.set_sql_connection_string(&sql_string(&dir, "shop"));
        assert_eq!(selector.validate().await.title(), Some("Database not found"));

        assert_eq!(selector.create_database(false).await.title(), Some("Success"));
        assert_eq!(selector.validate().await.title(), Some("Success"));
    }

    #[tokio::test]
    async fn test_sql_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let config = ConnectionConfig::parse(&sql_string(&dir, "shop")).unwrap();
        let bootstrapper = SchemaBootstrapper::new(&config).unwrap();
        bootstrapper.create().unwrap();
        bootstrapper
            .target()
            .open()
            .unwrap()
            .execute("UPDATE Version SET [Current] = '0.9'", [])
            .unwrap();

        let (mut selector, _) = selector_with(Arc::new(FakeProbe::default()));
        selector.select(DataProviderKind::Sql);
        selector.set_sql_connection_string(&sql_string(&dir, "shop"));

        assert_eq!(selector.validate().await.title(), Some("Version mismatch"));
    }

    #[tokio::test]
    async fn test_create_database_cancels_without_recreate() {
        let dir = TempDir::new().unwrap();
        let (mut selector, _) = selector_with(Arc::new(FakeProbe::default()));
        selector.select(DataProviderKind::Sql);
        selector.set_sql_connection_string(&sql_string(&dir, "shop"));

        assert_eq!(selector.create_database(false).await.title(), Some("Success"));
        let outcome = selector.create_database(false).await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.title(), Some("Canceled"));
        assert_eq!(selector.create_database(true).await.title(), Some("Success"));
    }

    #[tokio::test]
    async fn test_apply_changes_commits_only_valid_candidates() {
        let dir = TempDir::new().unwrap();
        let (mut selector, store) = selector_with(Arc::new(FakeProbe::default()));
        selector.select(DataProviderKind::Sql);
        selector.set_sql_connection_string(&sql_string(&dir, "shop"));
        assert!(selector.has_changes());

        let outcome = selector.apply_changes().await;
        assert_eq!(outcome.title(), Some("Database not found"));
        assert_eq!(store.get(DATA_PROVIDER_KEY).unwrap(), None);
        assert!(selector.has_changes());

        selector.create_database(false).await;
        assert!(selector.apply_changes().await.is_ok());
        assert_eq!(store.get(DATA_PROVIDER_KEY).unwrap().as_deref(), Some("sql"));
        assert_eq!(
            store.get(SQL_CONNECTION_STRING_KEY).unwrap(),
            Some(sql_string(&dir, "shop"))
        );
        assert!(!selector.has_changes());
    }

    #[tokio::test]
    async fn test_apply_changes_keeps_unsaved_parameters_pending() {
        let (mut selector, store) = selector_with(Arc::new(FakeProbe::default()));
        selector.set_sql_connection_string("Data Source=/srv/db;Initial Catalog=shop");
        selector.select(DataProviderKind::Rest);
        selector.set_service_url("http://localhost:3001");

        assert!(selector.apply_changes().await.is_ok());

        assert_eq!(store.get(SQL_CONNECTION_STRING_KEY).unwrap(), None);
        assert_eq!(selector.persisted().provider, DataProviderKind::Rest);
        assert_eq!(selector.persisted().service_url, "http://localhost:3001");
        assert_eq!(selector.persisted().sql_connection_string, "");
        assert!(selector.has_changes());
        assert_eq!(
            selector.persisted(),
            &ProviderSettings::load(store.as_ref()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_candidate_changes() {
        let (mut selector, _) = selector_with(Arc::new(FakeProbe::default()));
        let mut changes = selector.subscribe();

        selector.select(DataProviderKind::Rest);

        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().provider, DataProviderKind::Rest);

        selector.select(DataProviderKind::Rest);
        assert!(!changes.has_changed().unwrap());

        selector.discard_changes();
        assert_eq!(changes.borrow_and_update().provider, DataProviderKind::Local);
    }

    #[tokio::test]
    async fn test_reset_local_data() {
        let dir = TempDir::new().unwrap();
        let local = LocalCatalogStore::open(dir.path().join("local.db")).unwrap();
        local.repository().delete_item(1).unwrap();
        let (selector, _) = selector_with(Arc::new(FakeProbe::default()));

        let outcome = selector.reset_local_data(&local).await;

        assert_eq!(outcome.title(), Some("Success"));
        assert!(local.repository().get_item(1).unwrap().is_some());
    }
}
