use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the application reads its catalog from. Exactly one is active.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DataProviderKind {
    /// Embedded SQLite file in the data directory.
    #[default]
    Local,
    /// Remote catalog web service.
    Rest,
    /// Catalog database on a server reached through a connection string.
    Sql,
}

impl DataProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataProviderKind::Local => "local",
            DataProviderKind::Rest => "rest",
            DataProviderKind::Sql => "sql",
        }
    }
}

impl fmt::Display for DataProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataProviderKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(DataProviderKind::Local),
            "rest" => Ok(DataProviderKind::Rest),
            "sql" => Ok(DataProviderKind::Sql),
            other => Err(CatalogError::Validation(format!(
                "Unknown data provider '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("SQL".parse::<DataProviderKind>().unwrap(), DataProviderKind::Sql);
        assert_eq!(" Rest ".parse::<DataProviderKind>().unwrap(), DataProviderKind::Rest);
        assert_eq!(DataProviderKind::Local.to_string(), "local");
    }

    #[test]
    fn test_parse_unknown_is_validation_error() {
        let err = "mongo".parse::<DataProviderKind>().unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
