//! Fixtures shared by the search tests.

use time::macros::datetime;
use time::Duration;

use super::types::{CatalogItem, ItemId};

/// Active, approved item in stock. Price and creation time grow with `id`.
pub fn item(id: i64, name: &str) -> CatalogItem {
    CatalogItem {
        id: ItemId::new(id),
        name: name.to_string(),
        description: None,
        short_description: None,
        sku: None,
        part_number: None,
        category: None,
        brand: None,
        dealer_id: None,
        supplier_id: None,
        condition: None,
        price: 10.0 * id as f64,
        stock_quantity: 1,
        is_active: true,
        approval_status: "approved".to_string(),
        compatibility: Vec::new(),
        created_at: datetime!(2024-01-01 0:00 UTC) + Duration::days(id),
        updated_at: datetime!(2024-01-01 0:00 UTC),
    }
}
