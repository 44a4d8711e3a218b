//! Cart storage: one cart per account, line upserts, attached discounts
//!
//! Quantities here are advisory against stock; the authoritative stock check
//! happens inside the order placement transaction.

use crate::error::{FieldError, Result, StoreError};
use crate::storage::catalog::row_to_product;
use crate::storage::SqliteStore;
use crate::types::{CartDiscount, CartLine, DiscountKind, ProductId, UserId};
use chrono::Utc;
use sqlx::Row;

/// Everything a cart page or a checkout quote needs
#[derive(Debug, Clone, serde::Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub discounts: Vec<CartDiscount>,
}

impl CartView {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.line_total_cents()).sum()
    }

    pub fn discount_total_cents(&self) -> i64 {
        self.discounts.iter().map(|d| d.amount_cents).sum()
    }

    pub fn points_used(&self) -> i64 {
        self.discounts.iter().map(|d| d.points_used).sum()
    }
}

impl SqliteStore {
    /// Find or create the user's cart row, returning its id
    pub(crate) async fn get_or_create_cart_id(&self, user_id: UserId) -> Result<i64> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO carts (user_id, created_at, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id.to_string())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT id FROM carts WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("id")?)
    }

    /// Full cart contents with product rows joined in
    pub async fn cart_view(&self, user_id: UserId) -> Result<CartView> {
        let cart_id = self.get_or_create_cart_id(user_id).await?;

        let rows = sqlx::query(
            "SELECT p.*, ci.quantity AS cart_quantity
             FROM cart_items ci
             JOIN products p ON p.id = ci.product_id
             WHERE ci.cart_id = ?
             ORDER BY ci.added_at",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            lines.push(CartLine {
                product: row_to_product(row)?,
                quantity: row.try_get("cart_quantity")?,
            });
        }

        let discount_rows = sqlx::query(
            "SELECT * FROM cart_discounts WHERE cart_id = ? ORDER BY applied_at",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        let mut discounts = Vec::with_capacity(discount_rows.len());
        for row in &discount_rows {
            let kind_str: String = row.try_get("kind")?;
            discounts.push(CartDiscount {
                id: row.try_get("id")?,
                kind: DiscountKind::parse(&kind_str)
                    .ok_or_else(|| StoreError::Other(format!("unknown discount kind '{}'", kind_str)))?,
                amount_cents: row.try_get("amount_cents")?,
                points_used: row.try_get("points_used")?,
                description: row.try_get("description")?,
                applied_at: row.try_get("applied_at")?,
            });
        }

        Ok(CartView { lines, discounts })
    }

    /// Add a product to the cart, incrementing the line if already present
    pub async fn add_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(StoreError::Validation(vec![FieldError::new(
                "quantity",
                "must be at least 1",
            )]));
        }

        let product = self.get_product(product_id).await?;
        if !product.is_active {
            return Err(StoreError::NotFound(format!("product {}", product_id)));
        }
        if product.stock_quantity < quantity {
            return Err(StoreError::OutOfStock(product.name));
        }

        let cart_id = self.get_or_create_cart_id(user_id).await?;
        sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity, added_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(cart_id, product_id)
             DO UPDATE SET quantity = quantity + excluded.quantity",
        )
        .bind(cart_id)
        .bind(product_id.to_string())
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.touch_cart(cart_id).await?;
        self.cart_view(user_id).await
    }

    /// Set a line's quantity exactly
    pub async fn set_cart_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(StoreError::Validation(vec![FieldError::new(
                "quantity",
                "must be at least 1; delete the line to remove it",
            )]));
        }

        let cart_id = self.get_or_create_cart_id(user_id).await?;
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = ? WHERE cart_id = ? AND product_id = ?",
        )
        .bind(quantity)
        .bind(cart_id)
        .bind(product_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "cart line for product {}",
                product_id
            )));
        }

        self.touch_cart(cart_id).await?;
        self.cart_view(user_id).await
    }

    pub async fn remove_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartView> {
        let cart_id = self.get_or_create_cart_id(user_id).await?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND product_id = ?")
            .bind(cart_id)
            .bind(product_id.to_string())
            .execute(&self.pool)
            .await?;

        self.touch_cart(cart_id).await?;
        self.cart_view(user_id).await
    }

    async fn touch_cart(&self, cart_id: i64) -> Result<()> {
        sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
