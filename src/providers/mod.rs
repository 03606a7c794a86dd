//! Data provider selection: which catalog source the application uses and
//! how a candidate choice is validated before it is persisted.

mod kind;
mod probe;
mod selector;
mod settings;

pub use kind::DataProviderKind;
pub use probe::{ServiceProbe, WebApiClient, CATALOG_TYPES_PATH};
pub use selector::{Notice, ProviderSelector, ValidationOutcome};
pub use settings::{
    FileSettingsStore, InMemorySettingsStore, ProviderSettings, SettingsStore, DATA_PROVIDER_KEY,
    SERVICE_URL_KEY, SQL_CONNECTION_STRING_KEY,
};
