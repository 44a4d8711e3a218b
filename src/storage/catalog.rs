//! Catalog storage: categories, brands, products, stock adjustment
//!
//! Product stock is guarded at the SQL level; `adjust_stock` can never take a
//! quantity below zero, and deletion of products referenced by order history
//! is blocked by the schema (deactivate instead).

use crate::error::{FieldError, Result, StoreError};
use crate::storage::SqliteStore;
use crate::types::{Brand, BrandId, Category, CategoryId, Product, ProductId};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

/// Input for product creation
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    pub discount_price_cents: Option<i64>,
    pub category_id: CategoryId,
    pub subcategory_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub stock_quantity: i64,
    pub reorder_threshold: i64,
    pub is_featured: bool,
}

/// Partial update for an existing product. Stock is deliberately absent:
/// it only moves through order placement and `adjust_stock`.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub discount_price_cents: Option<i64>,
    #[serde(default)]
    pub clear_discount: bool,
    pub reorder_threshold: Option<i64>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Filter for product listings
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    /// Substring search over name, description, and SKU
    pub q: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Escape LIKE wildcards so the query matches as a literal substring
fn like_pattern(q: &str) -> String {
    let mut escaped = String::with_capacity(q.len() + 2);
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{}%", escaped)
}

pub(crate) fn row_to_product(row: &SqliteRow) -> Result<Product> {
    let id_str: String = row.try_get("id")?;
    Ok(Product {
        id: ProductId::from_string(&id_str)?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        price_cents: row.try_get("price_cents")?,
        discount_price_cents: row.try_get("discount_price_cents")?,
        category_id: row.try_get("category_id")?,
        subcategory_id: row.try_get("subcategory_id")?,
        brand_id: row.try_get("brand_id")?,
        stock_quantity: row.try_get("stock_quantity")?,
        reorder_threshold: row.try_get("reorder_threshold")?,
        is_featured: row.try_get("is_featured")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_category(row: &SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        parent_id: row.try_get("parent_id")?,
        sort_order: row.try_get("sort_order")?,
        is_active: row.try_get("is_active")?,
    })
}

impl SqliteStore {
    // -- categories ---------------------------------------------------------

    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        parent_id: Option<CategoryId>,
        sort_order: i64,
    ) -> Result<Category> {
        let mut errors = Vec::new();
        if name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if slug.trim().is_empty() {
            errors.push(FieldError::new("slug", "must not be empty"));
        }
        if let Some(parent) = parent_id {
            let parent_row = self.get_category(parent).await?;
            if parent_row.parent_id.is_some() {
                errors.push(FieldError::new(
                    "parent_id",
                    "subcategories cannot have children",
                ));
            }
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let result = sqlx::query(
            "INSERT INTO categories (name, slug, parent_id, sort_order, is_active)
             VALUES (?, ?, ?, ?, 1)",
        )
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .bind(sort_order)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::AlreadyExists(format!("category '{}'", name))
            }
            other => other.into(),
        })?;

        self.get_category(result.last_insert_rowid()).await
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;
        row_to_category(&row)
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Category> {
        let row = sqlx::query("SELECT * FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("category '{}'", name)))?;
        row_to_category(&row)
    }

    /// All active categories ordered for display
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT * FROM categories WHERE is_active = 1 ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_category).collect()
    }

    /// Top-level categories only: the prediction label space
    pub async fn list_top_level_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT * FROM categories
             WHERE is_active = 1 AND parent_id IS NULL
             ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_category).collect()
    }

    // -- brands -------------------------------------------------------------

    pub async fn create_brand(&self, name: &str, slug: &str) -> Result<Brand> {
        if name.trim().is_empty() || slug.trim().is_empty() {
            return Err(StoreError::Validation(vec![FieldError::new(
                "name",
                "brand name and slug must not be empty",
            )]));
        }

        let result = sqlx::query("INSERT INTO brands (name, slug, is_active) VALUES (?, ?, 1)")
            .bind(name)
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    StoreError::AlreadyExists(format!("brand '{}'", name))
                }
                other => other.into(),
            })?;

        Ok(Brand {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            slug: slug.to_string(),
            is_active: true,
        })
    }

    pub async fn list_brands(&self) -> Result<Vec<Brand>> {
        let rows = sqlx::query("SELECT * FROM brands WHERE is_active = 1 ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(Brand {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    slug: row.try_get("slug")?,
                    is_active: row.try_get("is_active")?,
                })
            })
            .collect()
    }

    // -- products -----------------------------------------------------------

    fn validate_new_product(new: &NewProduct) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if new.sku.trim().is_empty() {
            errors.push(FieldError::new("sku", "must not be empty"));
        }
        if new.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if new.price_cents < 0 {
            errors.push(FieldError::new("price_cents", "must not be negative"));
        }
        if let Some(discount) = new.discount_price_cents {
            if discount < 0 {
                errors.push(FieldError::new(
                    "discount_price_cents",
                    "must not be negative",
                ));
            } else if discount >= new.price_cents {
                errors.push(FieldError::new(
                    "discount_price_cents",
                    "must be less than the regular price",
                ));
            }
        }
        if new.stock_quantity < 0 {
            errors.push(FieldError::new("stock_quantity", "must not be negative"));
        }
        errors
    }

    pub async fn create_product(&self, new: &NewProduct) -> Result<Product> {
        let mut errors = Self::validate_new_product(new);

        // Referential checks before any write
        match self.get_category(new.category_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                errors.push(FieldError::new("category_id", "unknown category"))
            }
            Err(e) => return Err(e),
        }
        if let Some(sub_id) = new.subcategory_id {
            match self.get_category(sub_id).await {
                Ok(sub) if sub.parent_id != Some(new.category_id) => {
                    errors.push(FieldError::new(
                        "subcategory_id",
                        "subcategory must belong to the selected category",
                    ));
                }
                Ok(_) => {}
                Err(StoreError::NotFound(_)) => {
                    errors.push(FieldError::new("subcategory_id", "unknown subcategory"))
                }
                Err(e) => return Err(e),
            }
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let id = ProductId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO products
               (id, sku, name, slug, description, price_cents, discount_price_cents,
                category_id, subcategory_id, brand_id, stock_quantity, reorder_threshold,
                is_featured, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&new.sku)
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.price_cents)
        .bind(new.discount_price_cents)
        .bind(new.category_id)
        .bind(new.subcategory_id)
        .bind(new.brand_id)
        .bind(new.stock_quantity)
        .bind(new.reorder_threshold)
        .bind(new.is_featured)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::AlreadyExists(format!("product sku '{}'", new.sku))
            }
            other => other.into(),
        })?;

        debug!("created product {} ({})", new.sku, id);
        self.get_product(id).await
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))?;
        row_to_product(&row)
    }

    pub async fn get_product_by_sku(&self, sku: &str) -> Result<Product> {
        let row = sqlx::query("SELECT * FROM products WHERE sku = ?")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product sku '{}'", sku)))?;
        row_to_product(&row)
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        // Search queries need two characters minimum; oversized input is
        // truncated and search results are capped tighter than plain listings
        let query = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
        let pattern = match query {
            Some(q) if q.chars().count() < 2 => return Ok(Vec::new()),
            Some(q) => Some(like_pattern(&q.chars().take(100).collect::<String>())),
            None => None,
        };

        let max_limit = if pattern.is_some() { 50 } else { 200 };
        let limit = filter.limit.unwrap_or(50).clamp(1, max_limit);
        let offset = filter.offset.unwrap_or(0).max(0);

        // Category filter matches either the category or its subcategory slot
        let rows = sqlx::query(
            "SELECT * FROM products
             WHERE (? OR is_active = 1)
               AND (? IS NULL OR category_id = ? OR subcategory_id = ?)
               AND (? IS NULL OR brand_id = ?)
               AND (? IS NULL
                    OR name LIKE ? ESCAPE '\\'
                    OR description LIKE ? ESCAPE '\\'
                    OR sku LIKE ? ESCAPE '\\')
             ORDER BY is_featured DESC, created_at DESC
             LIMIT ? OFFSET ?",
        )
        .bind(filter.include_inactive)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(filter.category_id)
        .bind(filter.brand_id)
        .bind(filter.brand_id)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    pub async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product> {
        let mut product = self.get_product(id).await?;

        if let Some(name) = &update.name {
            product.name = name.clone();
        }
        if let Some(description) = &update.description {
            product.description = description.clone();
        }
        if let Some(price) = update.price_cents {
            product.price_cents = price;
        }
        if update.clear_discount {
            product.discount_price_cents = None;
        } else if let Some(discount) = update.discount_price_cents {
            product.discount_price_cents = Some(discount);
        }
        if let Some(threshold) = update.reorder_threshold {
            product.reorder_threshold = threshold;
        }
        if let Some(featured) = update.is_featured {
            product.is_featured = featured;
        }
        if let Some(active) = update.is_active {
            product.is_active = active;
        }

        // Re-validate the merged row; reject before writing anything
        let mut errors = Vec::new();
        if product.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if product.price_cents < 0 {
            errors.push(FieldError::new("price_cents", "must not be negative"));
        }
        if let Some(discount) = product.discount_price_cents {
            if discount < 0 || discount >= product.price_cents {
                errors.push(FieldError::new(
                    "discount_price_cents",
                    "must be non-negative and less than the regular price",
                ));
            }
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let now = Utc::now();
        sqlx::query(
            "UPDATE products SET
               name = ?, description = ?, price_cents = ?, discount_price_cents = ?,
               reorder_threshold = ?, is_featured = ?, is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.discount_price_cents)
        .bind(product.reorder_threshold)
        .bind(product.is_featured)
        .bind(product.is_active)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        product.updated_at = now;
        Ok(product)
    }

    /// Admin stock adjustment. Guarded so the result never goes negative;
    /// a decrement past zero is reported as OutOfStock with no change.
    pub async fn adjust_stock(&self, id: ProductId, delta: i64) -> Result<Product> {
        let result = sqlx::query(
            "UPDATE products
             SET stock_quantity = stock_quantity + ?, updated_at = ?
             WHERE id = ? AND stock_quantity + ? >= 0",
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id.to_string())
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish missing product from an over-decrement
            let product = self.get_product(id).await?;
            return Err(StoreError::OutOfStock(format!(
                "cannot adjust '{}' by {} (stock {})",
                product.name, delta, product.stock_quantity
            )));
        }

        self.get_product(id).await
    }

    /// Products at or below their reorder threshold, for the admin dashboard
    pub async fn low_stock_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT * FROM products
             WHERE is_active = 1 AND stock_quantity <= reorder_threshold
             ORDER BY stock_quantity ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_product).collect()
    }
}
