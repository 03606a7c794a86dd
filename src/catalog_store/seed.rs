//! Demo data inserted into freshly created catalogs.

use super::models::CatalogItem;
use super::repository::CatalogRepository;
use crate::error::CatalogResult;
use tracing::info;

pub const TYPE_MUG: i32 = 1;
pub const TYPE_TSHIRT: i32 = 2;
pub const TYPE_SHEET: i32 = 3;
pub const TYPE_USB_STICK: i32 = 4;

pub const BRAND_AZURE: i32 = 1;
pub const BRAND_DOTNET: i32 = 2;
pub const BRAND_VISUAL_STUDIO: i32 = 3;
pub const BRAND_SQL_SERVER: i32 = 4;
pub const BRAND_OTHER: i32 = 5;

pub const SEED_TYPES: &[(i32, &str)] = &[
    (TYPE_MUG, "Mug"),
    (TYPE_TSHIRT, "T-Shirt"),
    (TYPE_SHEET, "Sheet"),
    (TYPE_USB_STICK, "USB Memory Stick"),
];

pub const SEED_BRANDS: &[(i32, &str)] = &[
    (BRAND_AZURE, "Azure"),
    (BRAND_DOTNET, ".NET"),
    (BRAND_VISUAL_STUDIO, "Visual Studio"),
    (BRAND_SQL_SERVER, "SQL Server"),
    (BRAND_OTHER, "Other"),
];

pub struct SeedItem {
    pub id: i32,
    pub name: &'static str,
    pub description: &'static str,
    pub price: f64,
    pub type_id: i32,
    pub brand_id: i32,
}

pub const SEED_ITEMS: &[SeedItem] = &[
    SeedItem { id: 1, name: ".NET Bot Black Hoodie", description: "Black hoodie with the .NET bot", price: 19.5, type_id: TYPE_TSHIRT, brand_id: BRAND_DOTNET },
    SeedItem { id: 2, name: ".NET Black & White Mug", description: "Two-tone ceramic mug", price: 8.5, type_id: TYPE_MUG, brand_id: BRAND_DOTNET },
    SeedItem { id: 3, name: "Prism White T-Shirt", description: "Plain white cotton t-shirt", price: 12.0, type_id: TYPE_TSHIRT, brand_id: BRAND_OTHER },
    SeedItem { id: 4, name: ".NET Foundation T-shirt", description: "Foundation logo t-shirt", price: 12.0, type_id: TYPE_TSHIRT, brand_id: BRAND_DOTNET },
    SeedItem { id: 5, name: "Roslyn Red Sheet", description: "Red sticker sheet", price: 8.5, type_id: TYPE_SHEET, brand_id: BRAND_VISUAL_STUDIO },
    SeedItem { id: 6, name: ".NET Blue Hoodie", description: "Blue hoodie with the .NET logo", price: 12.0, type_id: TYPE_TSHIRT, brand_id: BRAND_DOTNET },
    SeedItem { id: 7, name: "Roslyn Red T-Shirt", description: "Red t-shirt with the compiler logo", price: 12.0, type_id: TYPE_TSHIRT, brand_id: BRAND_VISUAL_STUDIO },
    SeedItem { id: 8, name: "Kudu Purple Hoodie", description: "Purple hoodie", price: 8.5, type_id: TYPE_TSHIRT, brand_id: BRAND_AZURE },
    SeedItem { id: 9, name: "Cup<T> White Mug", description: "Generic white mug", price: 12.0, type_id: TYPE_MUG, brand_id: BRAND_OTHER },
    SeedItem { id: 10, name: ".NET Foundation Sheet", description: "Foundation sticker sheet", price: 12.0, type_id: TYPE_SHEET, brand_id: BRAND_DOTNET },
    SeedItem { id: 11, name: "Cup<T> Sheet", description: "Generic sticker sheet", price: 8.5, type_id: TYPE_SHEET, brand_id: BRAND_VISUAL_STUDIO },
    SeedItem { id: 12, name: "SQL Server 8GB Stick", description: "USB memory stick, 8GB", price: 16.0, type_id: TYPE_USB_STICK, brand_id: BRAND_SQL_SERVER },
];

/// 1x1 transparent PNG used as the picture of every seeded item.
pub const PLACEHOLDER_PICTURE: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

impl SeedItem {
    pub fn to_item(&self) -> CatalogItem {
        CatalogItem {
            description: Some(self.description.to_string()),
            picture_uri: Some(format!("{}.png", self.id)),
            ..CatalogItem::new(self.id, self.name, self.price, self.type_id, self.brand_id)
        }
    }
}

/// Inserts the demo types, brands, items and pictures into an empty catalog.
pub fn fill(repository: &CatalogRepository) -> CatalogResult<()> {
    for (id, name) in SEED_TYPES {
        repository.insert_type(*id, name)?;
    }
    for (id, name) in SEED_BRANDS {
        repository.insert_brand(*id, name)?;
    }
    for seed_item in SEED_ITEMS {
        repository.insert_item(&seed_item.to_item())?;
        repository.insert_image(seed_item.id, PLACEHOLDER_PICTURE)?;
    }
    info!(
        "Seeded {} with {} types, {} brands, {} items",
        repository.describe(),
        SEED_TYPES.len(),
        SEED_BRANDS.len(),
        SEED_ITEMS.len()
    );
    Ok(())
}
