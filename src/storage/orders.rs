//! Order storage: the all-or-nothing placement transaction, status
//! transitions, and the reporting queries behind the admin dashboard
//!
//! Placement performs order creation, guarded stock decrements, loyalty
//! accrual, and cart clearing in a single transaction. Any failure (most
//! commonly a stock conflict) rolls the whole thing back, leaving cart,
//! stock, and point balances exactly as they were.

use crate::error::{Result, StoreError};
use crate::services::loyalty::accrual_for_subtotal;
use crate::storage::SqliteStore;
use crate::types::{
    Order, OrderId, OrderItem, OrderStatus, ProductId, Quote, ShippingDetails, UserId,
};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{info, warn};
use uuid::Uuid;

/// One priced line of an order about to be placed
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Everything needed to place an order; totals come pre-computed from the
/// checkout quote pipeline
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub lines: Vec<NewOrderLine>,
    pub quote: Quote,
    pub shipping: ShippingDetails,
}

/// Status counts and revenue for the dashboard
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderMetrics {
    pub orders_by_status: Vec<(String, i64)>,
    pub total_orders: i64,
    pub revenue_cents: i64,
}

/// One row of the sales-by-category report
#[derive(Debug, Clone, serde::Serialize)]
pub struct SalesByCategoryRow {
    pub category: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

fn generate_order_number() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("AM{}{}", timestamp, suffix)
}

fn row_to_order(row: &SqliteRow) -> Result<Order> {
    let id_str: String = row.try_get("id")?;
    let user_str: String = row.try_get("user_id")?;
    let status_str: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::from_string(&id_str)?,
        order_number: row.try_get("order_number")?,
        user_id: UserId::from_string(&user_str)?,
        status: OrderStatus::parse(&status_str)
            .ok_or_else(|| StoreError::Other(format!("unknown order status '{}'", status_str)))?,
        subtotal_cents: row.try_get("subtotal_cents")?,
        discount_cents: row.try_get("discount_cents")?,
        tax_cents: row.try_get("tax_cents")?,
        shipping_cents: row.try_get("shipping_cents")?,
        total_cents: row.try_get("total_cents")?,
        shipping: ShippingDetails {
            name: row.try_get("shipping_name")?,
            address: row.try_get("shipping_address")?,
            city: row.try_get("shipping_city")?,
            zip_code: row.try_get("shipping_zip")?,
            country: row.try_get("shipping_country")?,
            phone: row.try_get("shipping_phone")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

impl SqliteStore {
    /// Place an order atomically: order + items + stock decrements + loyalty
    /// accrual + cart clearing commit together, or none of them do.
    pub async fn place_order(&self, new: &NewOrder) -> Result<Order> {
        if new.lines.is_empty() {
            return Err(StoreError::EmptyCart);
        }

        let order_id = OrderId::new();
        let order_number = generate_order_number();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders
               (id, order_number, user_id, status, subtotal_cents, discount_cents,
                tax_cents, shipping_cents, total_cents, shipping_name, shipping_address,
                shipping_city, shipping_zip, shipping_country, shipping_phone,
                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id.to_string())
        .bind(&order_number)
        .bind(new.user_id.to_string())
        .bind(OrderStatus::Pending.as_str())
        .bind(new.quote.subtotal_cents)
        .bind(new.quote.discount_cents)
        .bind(new.quote.tax_cents)
        .bind(new.quote.shipping_cents)
        .bind(new.quote.total_cents)
        .bind(&new.shipping.name)
        .bind(&new.shipping.address)
        .bind(&new.shipping.city)
        .bind(&new.shipping.zip_code)
        .bind(&new.shipping.country)
        .bind(&new.shipping.phone)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &new.lines {
            // Guarded decrement: this is what makes concurrent checkouts of
            // the last unit resolve to exactly one winner
            let decremented = sqlx::query(
                "UPDATE products
                 SET stock_quantity = stock_quantity - ?, updated_at = ?
                 WHERE id = ? AND is_active = 1 AND stock_quantity >= ?",
            )
            .bind(line.quantity)
            .bind(now)
            .bind(line.product_id.to_string())
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let name: String =
                    sqlx::query("SELECT name FROM products WHERE id = ?")
                        .bind(line.product_id.to_string())
                        .fetch_optional(&mut *tx)
                        .await?
                        .map(|r| r.try_get("name"))
                        .transpose()?
                        .unwrap_or_else(|| line.product_id.to_string());
                tx.rollback().await?;
                warn!("checkout rejected, insufficient stock for '{}'", name);
                return Err(StoreError::OutOfStock(name));
            }

            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, price_cents_at_purchase)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(order_id.to_string())
            .bind(line.product_id.to_string())
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .execute(&mut *tx)
            .await?;
        }

        let points = accrual_for_subtotal(new.quote.subtotal_cents);
        Self::accrue_in_tx(&mut tx, new.user_id, points, order_id).await?;

        // Consume the cart: lines and any applied discounts
        sqlx::query(
            "DELETE FROM cart_items
             WHERE cart_id IN (SELECT id FROM carts WHERE user_id = ?)",
        )
        .bind(new.user_id.to_string())
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM cart_discounts
             WHERE cart_id IN (SELECT id FROM carts WHERE user_id = ?)",
        )
        .bind(new.user_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "order {} placed for user {} ({} lines, total {} cents, {} points accrued)",
            order_number,
            new.user_id,
            new.lines.len(),
            new.quote.total_cents,
            points
        );

        self.get_order(order_id).await
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {}", id)))?;
        row_to_order(&row)
    }

    /// Customer-facing lookup: 404 rather than 403 for other users' orders
    pub async fn get_order_for_user(&self, id: OrderId, user_id: UserId) -> Result<Order> {
        let order = self.get_order(id).await?;
        if order.user_id != user_id {
            return Err(StoreError::NotFound(format!("order {}", id)));
        }
        Ok(order)
    }

    pub async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order).collect()
    }

    /// Admin listing, optionally filtered by status
    pub async fn list_orders(&self, status: Option<OrderStatus>, limit: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT * FROM orders
             WHERE (? IS NULL OR status = ?)
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_order).collect()
    }

    pub async fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            "SELECT oi.*, p.name AS product_name
             FROM order_items oi
             JOIN products p ON p.id = oi.product_id
             WHERE oi.order_id = ?",
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let product_str: String = row.try_get("product_id")?;
                Ok(OrderItem {
                    order_id,
                    product_id: ProductId::from_string(&product_str)?,
                    product_name: row.try_get("product_name")?,
                    quantity: row.try_get("quantity")?,
                    price_cents_at_purchase: row.try_get("price_cents_at_purchase")?,
                })
            })
            .collect()
    }

    /// Apply a validated status transition. The legal edges live on
    /// `OrderStatus`; anything else is rejected without a write.
    pub async fn transition_order_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order> {
        let order = self.get_order(id).await?;
        if !order.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition(format!(
                "{} -> {}",
                order.status, next
            )));
        }

        let now = Utc::now();
        let completed_at = if next == OrderStatus::Delivered {
            Some(now)
        } else {
            order.completed_at
        };

        sqlx::query(
            "UPDATE orders SET status = ?, updated_at = ?, completed_at = ? WHERE id = ?",
        )
        .bind(next.as_str())
        .bind(now)
        .bind(completed_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        info!("order {} transitioned {} -> {}", order.order_number, order.status, next);
        self.get_order(id).await
    }

    // -- reporting ----------------------------------------------------------

    pub async fn order_metrics(&self) -> Result<OrderMetrics> {
        let status_rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM orders GROUP BY status ORDER BY n DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut orders_by_status = Vec::with_capacity(status_rows.len());
        let mut total_orders = 0i64;
        for row in &status_rows {
            let n: i64 = row.try_get("n")?;
            total_orders += n;
            orders_by_status.push((row.try_get::<String, _>("status")?, n));
        }

        let revenue_row = sqlx::query(
            "SELECT COALESCE(SUM(total_cents), 0) AS revenue
             FROM orders WHERE status NOT IN ('cancelled', 'returned')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OrderMetrics {
            orders_by_status,
            total_orders,
            revenue_cents: revenue_row.try_get("revenue")?,
        })
    }

    /// Units and revenue per top-level category, over non-cancelled orders
    pub async fn sales_by_category(&self) -> Result<Vec<SalesByCategoryRow>> {
        let rows = sqlx::query(
            "SELECT c.name AS category,
                    COALESCE(SUM(oi.quantity), 0) AS units,
                    COALESCE(SUM(oi.quantity * oi.price_cents_at_purchase), 0) AS revenue
             FROM order_items oi
             JOIN orders o ON o.id = oi.order_id
             JOIN products p ON p.id = oi.product_id
             JOIN categories c ON c.id = p.category_id
             WHERE o.status NOT IN ('cancelled', 'returned')
             GROUP BY c.name
             ORDER BY revenue DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SalesByCategoryRow {
                    category: row.try_get("category")?,
                    units_sold: row.try_get("units")?,
                    revenue_cents: row.try_get("revenue")?,
                })
            })
            .collect()
    }
}
