//! CRUD surface over the catalog tables.
//!
//! Every operation is an independent round trip: it opens its own
//! connection through the [`CatalogConnector`] and drops it before
//! returning. There is no caching and no batching across entities.

use super::models::{CatalogBrand, CatalogImage, CatalogItem, CatalogType, ItemFilter, ANY_ID};
use super::trait_def::CatalogConnector;
use crate::error::CatalogResult;
use crate::server::metrics::record_db_query;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const ITEM_COLUMNS: &str = "Id, Name, Description, PictureUri, Price, CatalogTypeId, CatalogBrandId, IsDisabled, LastModified";

#[derive(Clone)]
pub struct CatalogRepository {
    connector: Arc<dyn CatalogConnector>,
}

impl CatalogRepository {
    pub fn new(connector: Arc<dyn CatalogConnector>) -> Self {
        CatalogRepository { connector }
    }

    pub fn describe(&self) -> String {
        self.connector.describe()
    }

    fn with_connection<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let start = Instant::now();
        let conn = self.connector.connect()?;
        let result = f(&conn);
        record_db_query(operation, start.elapsed());
        if let Err(err) = &result {
            debug!("{} failed on {}: {}", operation, self.connector.describe(), err);
        }
        result
    }

    fn parse_item_row(row: &Row) -> rusqlite::Result<CatalogItem> {
        let last_modified: i64 = row.get(8)?;
        Ok(CatalogItem {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            picture_uri: row.get(3)?,
            price: row.get(4)?,
            type_id: row.get(5)?,
            brand_id: row.get(6)?,
            is_disabled: row.get(7)?,
            last_modified: DateTime::<Utc>::from_timestamp(last_modified, 0).unwrap_or_default(),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_types(&self) -> CatalogResult<Vec<CatalogType>> {
        self.with_connection("get_types", |conn| {
            let mut stmt = conn.prepare("SELECT Id, Type FROM CatalogTypes ORDER BY Id")?;
            let types = stmt
                .query_map([], |r| {
                    Ok(CatalogType {
                        id: r.get(0)?,
                        name: r.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(types)
        })
    }

    pub fn get_brands(&self) -> CatalogResult<Vec<CatalogBrand>> {
        self.with_connection("get_brands", |conn| {
            let mut stmt = conn.prepare("SELECT Id, Brand FROM CatalogBrands ORDER BY Id")?;
            let brands = stmt
                .query_map([], |r| {
                    Ok(CatalogBrand {
                        id: r.get(0)?,
                        name: r.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(brands)
        })
    }

    pub fn get_item(&self, id: i32) -> CatalogResult<Option<CatalogItem>> {
        self.with_connection("get_item", |conn| {
            let item = conn
                .query_row(
                    &format!("SELECT {} FROM CatalogItems WHERE Id = ?1", ITEM_COLUMNS),
                    params![id],
                    Self::parse_item_row,
                )
                .optional()?;
            Ok(item)
        })
    }

    pub fn get_items(&self) -> CatalogResult<Vec<CatalogItem>> {
        self.get_items_filtered(&ItemFilter::default())
    }

    /// Items matching every active condition of `filter`, ordered by id.
    ///
    /// The text term is matched as a substring of the name or the
    /// description.
    pub fn get_items_filtered(&self, filter: &ItemFilter) -> CatalogResult<Vec<CatalogItem>> {
        let pattern = filter.like_pattern();
        self.with_connection("get_items_filtered", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM CatalogItems \
                 WHERE (?1 = ?4 OR CatalogTypeId = ?1) \
                 AND (?2 = ?4 OR CatalogBrandId = ?2) \
                 AND (?3 IS NULL OR Name LIKE ?3 ESCAPE '\\' OR Description LIKE ?3 ESCAPE '\\') \
                 ORDER BY Id",
                ITEM_COLUMNS
            ))?;
            let items = stmt
                .query_map(
                    params![filter.type_id, filter.brand_id, pattern, ANY_ID],
                    Self::parse_item_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(items)
        })
    }

    pub fn get_image(&self, id: i32) -> CatalogResult<Option<CatalogImage>> {
        self.with_connection("get_image", |conn| {
            let image = conn
                .query_row(
                    "SELECT Id, Picture FROM CatalogPictures WHERE Id = ?1",
                    params![id],
                    |r| {
                        Ok(CatalogImage {
                            id: r.get(0)?,
                            bytes: r.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(image)
        })
    }

    fn count(&self, operation: &'static str, table: &str) -> CatalogResult<usize> {
        self.with_connection(operation, |conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn count_types(&self) -> CatalogResult<usize> {
        self.count("count_types", "CatalogTypes")
    }

    pub fn count_brands(&self) -> CatalogResult<usize> {
        self.count("count_brands", "CatalogBrands")
    }

    pub fn count_items(&self) -> CatalogResult<usize> {
        self.count("count_items", "CatalogItems")
    }

    // =========================================================================
    // Inserts
    // =========================================================================

    pub fn insert_type(&self, id: i32, name: &str) -> CatalogResult<usize> {
        self.with_connection("insert_type", |conn| {
            Ok(conn.execute(
                "INSERT INTO CatalogTypes (Id, Type) VALUES (?1, ?2)",
                params![id, name],
            )?)
        })
    }

    pub fn insert_brand(&self, id: i32, name: &str) -> CatalogResult<usize> {
        self.with_connection("insert_brand", |conn| {
            Ok(conn.execute(
                "INSERT INTO CatalogBrands (Id, Brand) VALUES (?1, ?2)",
                params![id, name],
            )?)
        })
    }

    /// Inserts `item`; its `last_modified` is replaced by the current time.
    pub fn insert_item(&self, item: &CatalogItem) -> CatalogResult<usize> {
        let now = Utc::now().timestamp();
        self.with_connection("insert_item", |conn| {
            Ok(conn.execute(
                &format!(
                    "INSERT INTO CatalogItems ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    ITEM_COLUMNS
                ),
                params![
                    item.id,
                    item.name,
                    item.description,
                    item.picture_uri,
                    item.price,
                    item.type_id,
                    item.brand_id,
                    item.is_disabled,
                    now
                ],
            )?)
        })
    }

    pub fn insert_image(&self, id: i32, bytes: &[u8]) -> CatalogResult<usize> {
        self.with_connection("insert_image", |conn| {
            Ok(conn.execute(
                "INSERT INTO CatalogPictures (Id, Picture) VALUES (?1, ?2)",
                params![id, bytes],
            )?)
        })
    }

    // =========================================================================
    // Updates
    // =========================================================================

    pub fn update_type(&self, id: i32, name: &str) -> CatalogResult<usize> {
        self.with_connection("update_type", |conn| {
            Ok(conn.execute(
                "UPDATE CatalogTypes SET Type = ?1 WHERE Id = ?2",
                params![name, id],
            )?)
        })
    }

    pub fn update_brand(&self, id: i32, name: &str) -> CatalogResult<usize> {
        self.with_connection("update_brand", |conn| {
            Ok(conn.execute(
                "UPDATE CatalogBrands SET Brand = ?1 WHERE Id = ?2",
                params![name, id],
            )?)
        })
    }

    /// Overwrites every column of the item with the same id and stamps
    /// `LastModified` with the current time.
    pub fn update_item(&self, item: &CatalogItem) -> CatalogResult<usize> {
        let now = Utc::now().timestamp();
        self.with_connection("update_item", |conn| {
            Ok(conn.execute(
                "UPDATE CatalogItems SET Name = ?1, Description = ?2, PictureUri = ?3, \
                 Price = ?4, CatalogTypeId = ?5, CatalogBrandId = ?6, IsDisabled = ?7, \
                 LastModified = ?8 WHERE Id = ?9",
                params![
                    item.name,
                    item.description,
                    item.picture_uri,
                    item.price,
                    item.type_id,
                    item.brand_id,
                    item.is_disabled,
                    now,
                    item.id
                ],
            )?)
        })
    }

    pub fn update_image(&self, id: i32, bytes: &[u8]) -> CatalogResult<usize> {
        self.with_connection("update_image", |conn| {
            Ok(conn.execute(
                "UPDATE CatalogPictures SET Picture = ?1 WHERE Id = ?2",
                params![bytes, id],
            )?)
        })
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    pub fn delete_type(&self, id: i32) -> CatalogResult<usize> {
        self.with_connection("delete_type", |conn| {
            Ok(conn.execute("DELETE FROM CatalogTypes WHERE Id = ?1", params![id])?)
        })
    }

    pub fn delete_brand(&self, id: i32) -> CatalogResult<usize> {
        self.with_connection("delete_brand", |conn| {
            Ok(conn.execute("DELETE FROM CatalogBrands WHERE Id = ?1", params![id])?)
        })
    }

    pub fn delete_item(&self, id: i32) -> CatalogResult<usize> {
        self.with_connection("delete_item", |conn| {
            Ok(conn.execute("DELETE FROM CatalogItems WHERE Id = ?1", params![id])?)
        })
    }

    pub fn delete_image(&self, id: i32) -> CatalogResult<usize> {
        self.with_connection("delete_image", |conn| {
            Ok(conn.execute("DELETE FROM CatalogPictures WHERE Id = ?1", params![id])?)
        })
    }
}
