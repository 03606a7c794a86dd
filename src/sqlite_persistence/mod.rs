mod versioned_schema;

pub use versioned_schema::{
    stored_version, Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
};
