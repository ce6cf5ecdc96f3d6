//! # Demo Catalog
//!
//! The storefront's starter catalog, used by the `seed` binary and by
//! `aisle-node --seed`.

use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;
use aisle_core::Product;

/// `(id, title, price, discount price, weight spec, category)`, prices in cents.
const DEMO_PRODUCTS: &[(&str, &str, i64, Option<i64>, &str, &str)] = &[
    ("p01", "Premium Organic Almonds", 2499, Some(1999), "500g", "Nuts & Seeds"),
    ("p02", "Fresh Strawberries Pack", 899, Some(649), "1kg", "Fruits"),
    ("p03", "Whole Grain Bread", 499, None, "750g", "Bakery"),
    ("p04", "Organic Free Range Eggs", 699, Some(549), "12 eggs", "Dairy & Eggs"),
    ("p05", "Greek Yogurt Natural", 599, None, "500g", "Dairy & Eggs"),
    ("p06", "Premium Coffee Beans", 1899, Some(1499), "1kg", "Beverages"),
    ("p07", "Organic Honey Raw", 1299, Some(999), "500g", "Pantry"),
    ("p08", "Fresh Salmon Fillet", 2299, None, "400g", "Seafood"),
    ("p09", "Quinoa Organic", 999, Some(799), "1kg", "Grains"),
    ("p10", "Extra Virgin Olive Oil", 1699, None, "750ml", "Pantry"),
    ("p11", "Dark Chocolate Premium", 799, Some(599), "200g", "Snacks"),
    ("p12", "Green Tea Organic", 1199, Some(899), "100g (50 bags)", "Beverages"),
    ("p13", "Pasta Whole Wheat", 399, None, "500g", "Grains"),
    ("p14", "Cheddar Cheese Aged", 1399, Some(1099), "400g", "Dairy & Eggs"),
    ("p15", "Mixed Nuts Premium", 1599, Some(1299), "600g", "Nuts & Seeds"),
];

/// The demo catalog as products.
pub fn demo_products() -> Vec<Product> {
    DEMO_PRODUCTS
        .iter()
        .map(|(id, title, price, discount, weight, category)| Product {
            id: id.to_string(),
            title: title.to_string(),
            price_cents: *price,
            discount_price_cents: *discount,
            weight_spec: weight.to_string(),
            category: Some(category.to_string()),
        })
        .collect()
}

/// Loads the demo catalog unless the catalog already has products.
///
/// ## Returns
/// Number of products written (0 when skipped).
pub async fn seed_demo_catalog(db: &Database) -> DbResult<usize> {
    let existing = db.products().count().await?;
    if existing > 0 {
        info!(existing, "Catalog already populated, skipping seed");
        return Ok(0);
    }

    let products = demo_products();
    for product in &products {
        db.products().upsert(product).await?;
    }

    info!(count = products.len(), "Demo catalog seeded");
    Ok(products.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use aisle_core::weight::parse_weight_spec;

    #[test]
    fn test_every_demo_weight_parses() {
        for product in demo_products() {
            assert!(
                parse_weight_spec(&product.weight_spec) > 0.0,
                "{} has unparsable weight {}",
                product.title,
                product.weight_spec
            );
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(seed_demo_catalog(&db).await.unwrap(), 15);
        assert_eq!(seed_demo_catalog(&db).await.unwrap(), 0);

        let eggs = db
            .products()
            .find_by_title("organic free range eggs")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(eggs.effective_price().cents(), 549);
    }
}
