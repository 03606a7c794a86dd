//! Catalog entities.
//!
//! Items reference types and brands by id only; nothing beyond the backing
//! store's own constraints keeps those references consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel id meaning "no filter" in [`ItemFilter`].
pub const ANY_ID: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogType {
    pub id: i32,
    #[serde(rename = "type")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogBrand {
    pub id: i32,
    #[serde(rename = "brand")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub picture_uri: Option<String>,
    pub price: f64,
    #[serde(rename = "catalogTypeId")]
    pub type_id: i32,
    #[serde(rename = "catalogBrandId")]
    pub brand_id: i32,
    pub is_disabled: bool,
    /// Stamped by the store on every insert and update.
    pub last_modified: DateTime<Utc>,
}

impl CatalogItem {
    pub fn new(id: i32, name: &str, price: f64, type_id: i32, brand_id: i32) -> Self {
        CatalogItem {
            id,
            name: name.to_string(),
            description: None,
            picture_uri: None,
            price,
            type_id,
            brand_id,
            is_disabled: false,
            last_modified: DateTime::<Utc>::default(),
        }
    }
}

/// Picture bytes of the item with the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogImage {
    pub id: i32,
    pub bytes: Vec<u8>,
}

fn any_id() -> i32 {
    ANY_ID
}

/// Item query parameters. `type_id`/`brand_id` equal to [`ANY_ID`] and an
/// empty `query` disable the corresponding condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFilter {
    #[serde(default = "any_id")]
    pub type_id: i32,
    #[serde(default = "any_id")]
    pub brand_id: i32,
    #[serde(default)]
    pub query: Option<String>,
}

impl Default for ItemFilter {
    fn default() -> Self {
        ItemFilter {
            type_id: ANY_ID,
            brand_id: ANY_ID,
            query: None,
        }
    }
}

impl ItemFilter {
    pub fn new(type_id: i32, brand_id: i32, query: Option<&str>) -> Self {
        ItemFilter {
            type_id,
            brand_id,
            query: query.map(str::to_string),
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.type_id == ANY_ID && self.brand_id == ANY_ID && self.like_pattern().is_none()
    }

    /// The free-text term wrapped for a substring `LIKE` match, with the
    /// wildcard characters of the term itself escaped by `\`.
    pub fn like_pattern(&self) -> Option<String> {
        let term = self.query.as_deref().map(str::trim).unwrap_or_default();
        if term.is_empty() {
            return None;
        }
        let mut escaped = String::with_capacity(term.len() + 2);
        escaped.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        Some(escaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_unfiltered() {
        assert!(ItemFilter::default().is_unfiltered());
        assert!(ItemFilter::new(ANY_ID, ANY_ID, Some("")).is_unfiltered());
        assert!(ItemFilter::new(ANY_ID, ANY_ID, Some("   ")).is_unfiltered());
        assert!(!ItemFilter::new(1, ANY_ID, None).is_unfiltered());
    }

    #[test]
    fn test_like_pattern_wraps_term() {
        let filter = ItemFilter::new(ANY_ID, ANY_ID, Some("mug"));
        assert_eq!(filter.like_pattern(), Some("%mug%".to_string()));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let filter = ItemFilter::new(ANY_ID, ANY_ID, Some("100%_off\\"));
        assert_eq!(
            filter.like_pattern(),
            Some("%100\\%\\_off\\\\%".to_string())
        );
    }

    #[test]
    fn test_filter_deserializes_with_sentinel_defaults() {
        let filter: ItemFilter = serde_json::from_str(r#"{"brandId": 2}"#).unwrap();
        assert_eq!(filter, ItemFilter::new(ANY_ID, 2, None));
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = CatalogItem::new(7, "Mug", 8.5, 1, 2);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["catalogTypeId"], 1);
        assert_eq!(json["catalogBrandId"], 2);
        assert_eq!(json["isDisabled"], false);
        assert!(json.get("pictureUri").is_some());
    }
}
