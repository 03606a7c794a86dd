//! Table layout of the Local embedded catalog store.
//!
//! Mirrors the tables created by the Sql provider's DDL script so the same
//! repository queries run against both.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const CATALOG_TYPES_TABLE: Table = Table {
    name: "CatalogTypes",
    columns: &[
        sqlite_column!("Id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("Type", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const CATALOG_BRANDS_TABLE: Table = Table {
    name: "CatalogBrands",
    columns: &[
        sqlite_column!("Id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("Brand", &SqlType::Text, non_null = true),
    ],
    indices: &[],
};

const CATALOG_ITEMS_TABLE: Table = Table {
    name: "CatalogItems",
    columns: &[
        sqlite_column!("Id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("Name", &SqlType::Text, non_null = true),
        sqlite_column!("Description", &SqlType::Text),
        sqlite_column!("PictureUri", &SqlType::Text),
        sqlite_column!("Price", &SqlType::Real, non_null = true),
        sqlite_column!("CatalogTypeId", &SqlType::Integer, non_null = true),
        sqlite_column!("CatalogBrandId", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "IsDisabled",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("LastModified", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("IX_CatalogItems_Type", "CatalogTypeId"),
        ("IX_CatalogItems_Brand", "CatalogBrandId"),
    ],
};

const CATALOG_PICTURES_TABLE: Table = Table {
    name: "CatalogPictures",
    columns: &[
        sqlite_column!("Id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("Picture", &SqlType::Blob, non_null = true),
    ],
    indices: &[],
};

pub const LOCAL_CATALOG_SCHEMA: VersionedSchema = VersionedSchema {
    version: 1,
    tables: &[
        CATALOG_TYPES_TABLE,
        CATALOG_BRANDS_TABLE,
        CATALOG_ITEMS_TABLE,
        CATALOG_PICTURES_TABLE,
    ],
};

/// Tables emptied by a local data reset, children first.
pub const CATALOG_TABLE_NAMES: &[&str] = &[
    "CatalogPictures",
    "CatalogItems",
    "CatalogBrands",
    "CatalogTypes",
];
