use crate::error::{CatalogError, CatalogResult};
use rusqlite::{params, Connection};

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed.
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }

    fn from_sql(declared: &str) -> Option<&'static SqlType> {
        match declared.to_ascii_uppercase().as_str() {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            "BLOB" => Some(&SqlType::Blob),
            _ => None,
        }
    }
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<&'static str>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
}

struct ActualColumn {
    name: String,
    declared_type: String,
    non_null: bool,
    default_value: Option<String>,
    is_primary_key: bool,
}

fn schema_error(message: String) -> CatalogError {
    CatalogError::Schema(message)
}

impl Table {
    pub fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut definition = format!("\"{}\" {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    definition.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    definition.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    definition.push_str(&format!(" DEFAULT {}", default_value));
                }
                definition
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE \"{}\" ({});", self.name, columns)
    }

    pub fn create(&self, conn: &Connection) -> CatalogResult<()> {
        conn.execute(&self.create_sql(), params![])?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX \"{}\" ON \"{}\"(\"{}\");",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn actual_columns(&self, conn: &Connection) -> CatalogResult<Vec<ActualColumn>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\");", self.name))?;
        let columns = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    pub fn validate(&self, conn: &Connection) -> CatalogResult<()> {
        let actual_columns = self.actual_columns(conn)?;
        if actual_columns.is_empty() {
            return Err(schema_error(format!("Table {} does not exist", self.name)));
        }
        if actual_columns.len() != self.columns.len() {
            return Err(schema_error(format!(
                "Table {} has {} columns, expected {}. Found: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                return Err(schema_error(format!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name, expected.name, actual.name
                )));
            }
            if SqlType::from_sql(&actual.declared_type) != Some(expected.sql_type) {
                return Err(schema_error(format!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name, expected.name, expected.sql_type, actual.declared_type
                )));
            }
            if actual.non_null != expected.non_null {
                return Err(schema_error(format!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name, expected.name, expected.non_null, actual.non_null
                )));
            }
            // SQLite may report defaults wrapped in parentheses.
            let actual_default = actual
                .default_value
                .as_deref()
                .map(strip_leading_and_trailing_parentheses);
            let expected_default = expected
                .default_value
                .map(strip_leading_and_trailing_parentheses);
            if actual_default != expected_default {
                return Err(schema_error(format!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    self.name, expected.name, expected.default_value, actual.default_value
                )));
            }
            if actual.is_primary_key != expected.is_primary_key {
                return Err(schema_error(format!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name, expected.name, expected.is_primary_key, actual.is_primary_key
                )));
            }
        }

        for (index_name, _) in self.indices {
            let index_exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !index_exists {
                return Err(schema_error(format!(
                    "Table {} is missing index '{}'",
                    self.name, index_name
                )));
            }
        }
        Ok(())
    }
}

fn strip_leading_and_trailing_parentheses(s: &str) -> String {
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// A full database layout tagged with a version, stored in `PRAGMA user_version`.
pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> CatalogResult<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> CatalogResult<()> {
        let stored = stored_version(conn)?;
        if stored != Some(self.version) {
            return Err(schema_error(format!(
                "Database schema version is {:?}, expected {}",
                stored, self.version
            )));
        }
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Returns the schema version stored in the database, `None` for databases
/// that were never initialized by this crate.
pub fn stored_version(conn: &Connection) -> CatalogResult<Option<usize>> {
    let user_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if user_version < BASE_DB_VERSION as i64 {
        return Ok(None);
    }
    Ok(Some(user_version as usize - BASE_DB_VERSION))
}

pub const BASE_DB_VERSION: usize = 99999;
