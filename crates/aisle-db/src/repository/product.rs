//! # Product Repository
//!
//! Catalog reads for the intake pipelines, writes for the seeder.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::title_key;
use crate::error::{DbError, DbResult};
use aisle_core::validation::validate_product;
use aisle_core::Product;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    title: String,
    price_cents: i64,
    discount_price_cents: Option<i64>,
    weight_spec: String,
    category: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            price_cents: row.price_cents,
            discount_price_cents: row.discount_price_cents,
            weight_spec: row.weight_spec,
            category: row.category,
        }
    }
}

const SELECT_PRODUCT: &str = r#"
    SELECT id, title, price_cents, discount_price_cents, weight_spec, category
    FROM products
"#;

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets an active product by its id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1 AND is_active = 1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Product::from))
    }

    /// Finds an active product by exact title, ignoring case and
    /// surrounding whitespace.
    ///
    /// When two products share a title the oldest wins.
    pub async fn find_by_title(&self, title: &str) -> DbResult<Option<Product>> {
        let key = title_key(title);
        debug!(title = %key, "Looking up product by title");

        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE title_key = ?1 AND is_active = 1 ORDER BY created_at, id LIMIT 1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Lists active products sorted by title.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE is_active = 1 ORDER BY title_key LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts a product, or replaces the existing one with the same id.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        validate_product(product).map_err(|e| DbError::InvalidRecord(e.to_string()))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, title_key, price_cents, discount_price_cents,
                weight_spec, category, is_active, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                title_key = excluded.title_key,
                price_cents = excluded.price_cents,
                discount_price_cents = excluded.discount_price_cents,
                weight_spec = excluded.weight_spec,
                category = excluded.category,
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(product.title.trim())
        .bind(title_key(&product.title))
        .bind(product.price_cents)
        .bind(product.discount_price_cents)
        .bind(&product.weight_spec)
        .bind(&product.category)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %product.id, title = %product.title, "Product upserted");
        Ok(())
    }

    /// Hides a product from lookups without deleting it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
